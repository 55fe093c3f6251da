use std::collections::HashMap;

use serde::Serialize;

use ft_core::{ChannelFilter, FilterSource, KeywordFilter};

use crate::parser::Settings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeStats {
    pub keywords_before: usize,
    pub keywords_after: usize,
    pub channels_before: usize,
    pub channels_after: usize,
    pub duplicate_keywords: usize,
    pub duplicate_channels: usize,
    pub unidentified_channels: usize,
    pub derived_keywords: usize,
}

/// Dedupe both lists and regenerate channel-derived keywords.
///
/// Derived keywords found in the input are discarded first, so removing a
/// channel (or clearing its "filter all" toggle) removes its keyword too.
pub fn optimize_settings(settings: &mut Settings) -> OptimizeStats {
    let keywords_before = settings.keywords.len();
    let channels_before = settings.channels.len();

    let (channels, duplicate_channels, unidentified_channels) =
        dedupe_channels(std::mem::take(&mut settings.channels));
    settings.channels = channels;

    settings.keywords.retain(|k| k.source != FilterSource::Channel);
    let derived = derive_channel_keywords(&settings.channels);
    let derived_keywords = derived.len();
    settings.keywords.extend(derived);

    let (keywords, duplicate_keywords) = dedupe_keywords(std::mem::take(&mut settings.keywords));
    settings.keywords = keywords;

    OptimizeStats {
        keywords_before,
        keywords_after: settings.keywords.len(),
        channels_before,
        channels_after: settings.channels.len(),
        duplicate_keywords,
        duplicate_channels,
        unidentified_channels,
        derived_keywords,
    }
}

fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

/// Later duplicates only contribute fields the first entry lacks, plus its
/// toggles.
fn merge_channel(kept: &mut ChannelFilter, dup: &ChannelFilter) {
    fill(&mut kept.id, &dup.id);
    fill(&mut kept.handle, &dup.handle);
    fill(&mut kept.canonical_handle, &dup.canonical_handle);
    fill(&mut kept.handle_display, &dup.handle_display);
    fill(&mut kept.custom_url, &dup.custom_url);
    fill(&mut kept.name, &dup.name);
    kept.filter_all |= dup.filter_all;
    kept.filter_all_comments |= dup.filter_all_comments;
}

fn dedupe_channels(channels: Vec<ChannelFilter>) -> (Vec<ChannelFilter>, usize, usize) {
    let mut out: Vec<ChannelFilter> = Vec::with_capacity(channels.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0usize;
    let mut unidentified = 0usize;

    for channel in channels {
        let Some(key) = channel.key() else {
            unidentified += 1;
            continue;
        };

        match seen.get(&key) {
            Some(&index) => {
                duplicates += 1;
                merge_channel(&mut out[index], &channel);
            }
            None => {
                seen.insert(key, out.len());
                out.push(channel);
            }
        }
    }

    (out, duplicates, unidentified)
}

fn derive_channel_keywords(channels: &[ChannelFilter]) -> Vec<KeywordFilter> {
    channels
        .iter()
        .filter(|c| c.filter_all)
        .filter_map(|channel| {
            let word = channel.display_label()?;
            Some(KeywordFilter {
                source: FilterSource::Channel,
                channel_ref: channel.key(),
                comments: channel.filter_all_comments,
                added_at: channel.added_at,
                ..KeywordFilter::new(word, true)
            })
        })
        .collect()
}

fn dedupe_keywords(keywords: Vec<KeywordFilter>) -> (Vec<KeywordFilter>, usize) {
    let mut out: Vec<KeywordFilter> = Vec::with_capacity(keywords.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0usize;

    for keyword in keywords {
        let key = keyword.dedupe_key();
        match seen.get(&key) {
            Some(&index) => {
                duplicates += 1;
                let existing = &mut out[index];
                if existing.source == FilterSource::Channel && keyword.source != FilterSource::Channel {
                    *existing = keyword;
                }
            }
            None => {
                seen.insert(key, out.len());
                out.push(keyword);
            }
        }
    }

    (out, duplicates)
}
