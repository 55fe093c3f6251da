//! Rule Registry
//!
//! Static table mapping renderer / view-model shape tags to the field paths
//! used to read title, channel, description and comment data out of them.
//! Unregistered tags map to `NodeShape::Unknown` and are never blocked.

use serde_json::Value;

use crate::path::{first_string, first_text, get_path};
use crate::types::ChannelIdentity;

// =============================================================================
// Shapes
// =============================================================================

/// Closed set of node shapes the filter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeShape {
    VideoRenderer,
    GridVideoRenderer,
    CompactVideoRenderer,
    PlaylistVideoRenderer,
    PlaylistPanelVideoRenderer,
    VideoWithContextRenderer,
    EndScreenVideoRenderer,
    WatchCardCompactVideoRenderer,
    MovieRenderer,
    LockupViewModel,
    ReelItemRenderer,
    ShortsLockupViewModel,
    ShortsLockupViewModelV2,
    ReelShelfRenderer,
    ChannelRenderer,
    GridChannelRenderer,
    PlaylistRenderer,
    GridPlaylistRenderer,
    CompactPlaylistRenderer,
    RadioRenderer,
    CompactRadioRenderer,
    PostRenderer,
    BackstagePostRenderer,
    CommentThreadRenderer,
    CommentRenderer,
    CommentViewModel,
    CommentsEntryPointHeaderRenderer,
    RichItemRenderer,
    RichSectionRenderer,
    /// Renderer-style key with no registry entry
    Unknown,
}

/// Broad category of a shape; drives which block checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Video,
    Short,
    Channel,
    Playlist,
    Post,
    Comment,
    /// Wraps a single item; never evaluated directly
    Container,
}

/// Ordered path lists per extracted field. The first non-empty path wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldPaths {
    pub video_id: &'static [&'static str],
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub channel_name: &'static [&'static str],
    pub channel_id: &'static [&'static str],
    pub channel_url: &'static [&'static str],
    pub comment_text: &'static [&'static str],
}

impl FieldPaths {
    const NONE: FieldPaths = FieldPaths {
        video_id: &[],
        title: &[],
        description: &[],
        channel_name: &[],
        channel_id: &[],
        channel_url: &[],
        comment_text: &[],
    };
}

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct RuleEntry {
    pub tag: &'static str,
    pub shape: NodeShape,
    pub kind: ShapeKind,
    pub fields: FieldPaths,
    /// Child key whose removal removes this node too
    pub wraps: Option<&'static str>,
}

// =============================================================================
// Shared Path Lists
// =============================================================================

const BYLINE_NAME: &[&str] = &["ownerText", "shortBylineText", "longBylineText"];

const BYLINE_ID: &[&str] = &[
    "ownerText.runs.0.navigationEndpoint.browseEndpoint.browseId",
    "shortBylineText.runs.0.navigationEndpoint.browseEndpoint.browseId",
    "longBylineText.runs.0.navigationEndpoint.browseEndpoint.browseId",
    "channelThumbnailSupportedRenderers.channelThumbnailWithLinkRenderer.navigationEndpoint.browseEndpoint.browseId",
];

const BYLINE_URL: &[&str] = &[
    "ownerText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
    "shortBylineText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
    "longBylineText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
    "ownerText.runs.0.navigationEndpoint.commandMetadata.webCommandMetadata.url",
    "shortBylineText.runs.0.navigationEndpoint.commandMetadata.webCommandMetadata.url",
];

const DESCRIPTION: &[&str] = &[
    "descriptionSnippet",
    "detailedMetadataSnippets.0.snippetText",
    "description",
];

const VIDEO: FieldPaths = FieldPaths {
    video_id: &["videoId"],
    title: &["title", "headline"],
    description: DESCRIPTION,
    channel_name: BYLINE_NAME,
    channel_id: BYLINE_ID,
    channel_url: BYLINE_URL,
    comment_text: &[],
};

const LOCKUP: FieldPaths = FieldPaths {
    video_id: &["contentId"],
    title: &["metadata.lockupMetadataViewModel.title"],
    description: &[],
    channel_name: &[
        "metadata.lockupMetadataViewModel.metadata.contentMetadataViewModel.metadataRows.0.metadataParts.0.text",
    ],
    channel_id: &[
        "metadata.lockupMetadataViewModel.image.decoratedAvatarViewModel.rendererContext.commandContext.onTap.innertubeCommand.browseEndpoint.browseId",
        "metadata.lockupMetadataViewModel.metadata.contentMetadataViewModel.metadataRows.0.metadataParts.0.text.commandRuns.0.onTap.innertubeCommand.browseEndpoint.browseId",
    ],
    channel_url: &[
        "metadata.lockupMetadataViewModel.image.decoratedAvatarViewModel.rendererContext.commandContext.onTap.innertubeCommand.browseEndpoint.canonicalBaseUrl",
        "metadata.lockupMetadataViewModel.metadata.contentMetadataViewModel.metadataRows.0.metadataParts.0.text.commandRuns.0.onTap.innertubeCommand.browseEndpoint.canonicalBaseUrl",
    ],
    comment_text: &[],
};

const SHORTS_LOCKUP: FieldPaths = FieldPaths {
    video_id: &["onTap.innertubeCommand.reelWatchEndpoint.videoId", "entityId"],
    title: &["overlayMetadata.primaryText", "accessibilityText"],
    ..FieldPaths::NONE
};

const REEL_ITEM: FieldPaths = FieldPaths {
    video_id: &["videoId"],
    title: &["headline", "accessibility.accessibilityData.label"],
    ..FieldPaths::NONE
};

const CHANNEL: FieldPaths = FieldPaths {
    video_id: &[],
    title: &["title"],
    description: &["descriptionSnippet"],
    channel_name: &["title"],
    channel_id: &["channelId", "navigationEndpoint.browseEndpoint.browseId"],
    channel_url: &[
        "navigationEndpoint.browseEndpoint.canonicalBaseUrl",
        // Channel results put the @handle here, not a count
        "subscriberCountText",
        "customUrl",
    ],
    comment_text: &[],
};

const PLAYLIST: FieldPaths = FieldPaths {
    video_id: &["playlistId"],
    title: &["title"],
    ..VIDEO
};

const RADIO: FieldPaths = FieldPaths {
    video_id: &["playlistId"],
    title: &["title"],
    ..FieldPaths::NONE
};

const POST: FieldPaths = FieldPaths {
    video_id: &["postId"],
    title: &[],
    description: &["contentText"],
    channel_name: &["authorText"],
    channel_id: &["authorEndpoint.browseEndpoint.browseId"],
    channel_url: &["authorEndpoint.browseEndpoint.canonicalBaseUrl"],
    comment_text: &[],
};

const COMMENT_THREAD: FieldPaths = FieldPaths {
    video_id: &["comment.commentRenderer.commentId"],
    title: &[],
    description: &[],
    channel_name: &["comment.commentRenderer.authorText"],
    channel_id: &["comment.commentRenderer.authorEndpoint.browseEndpoint.browseId"],
    channel_url: &["comment.commentRenderer.authorEndpoint.browseEndpoint.canonicalBaseUrl"],
    comment_text: &["comment.commentRenderer.contentText"],
};

const COMMENT: FieldPaths = FieldPaths {
    video_id: &["commentId"],
    title: &[],
    description: &[],
    channel_name: &["authorText"],
    channel_id: &["authorEndpoint.browseEndpoint.browseId"],
    channel_url: &["authorEndpoint.browseEndpoint.canonicalBaseUrl"],
    comment_text: &["contentText"],
};

const COMMENTS_TEASER: FieldPaths = FieldPaths {
    comment_text: &["contentRenderer.commentsEntryPointTeaserRenderer.teaserContent"],
    ..FieldPaths::NONE
};

/// Applied after the shape-specific paths of a field come up empty.
const FALLBACK: FieldPaths = FieldPaths {
    video_id: &["videoId"],
    title: &["title", "headline", "name"],
    description: DESCRIPTION,
    channel_name: BYLINE_NAME,
    channel_id: &[
        "channelId",
        "ownerText.runs.0.navigationEndpoint.browseEndpoint.browseId",
        "shortBylineText.runs.0.navigationEndpoint.browseEndpoint.browseId",
        "longBylineText.runs.0.navigationEndpoint.browseEndpoint.browseId",
    ],
    channel_url: &[
        "ownerText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
        "shortBylineText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
        "longBylineText.runs.0.navigationEndpoint.browseEndpoint.canonicalBaseUrl",
    ],
    comment_text: &[],
};

// =============================================================================
// Registry
// =============================================================================

const fn entry(tag: &'static str, shape: NodeShape, kind: ShapeKind, fields: FieldPaths) -> RuleEntry {
    RuleEntry {
        tag,
        shape,
        kind,
        fields,
        wraps: None,
    }
}

const fn wrapper(tag: &'static str, shape: NodeShape, kind: ShapeKind, wraps: &'static str) -> RuleEntry {
    RuleEntry {
        tag,
        shape,
        kind,
        fields: FieldPaths::NONE,
        wraps: Some(wraps),
    }
}

static RULES: &[RuleEntry] = &[
    entry("videoRenderer", NodeShape::VideoRenderer, ShapeKind::Video, VIDEO),
    entry("gridVideoRenderer", NodeShape::GridVideoRenderer, ShapeKind::Video, VIDEO),
    entry("compactVideoRenderer", NodeShape::CompactVideoRenderer, ShapeKind::Video, VIDEO),
    entry("playlistVideoRenderer", NodeShape::PlaylistVideoRenderer, ShapeKind::Video, VIDEO),
    entry("playlistPanelVideoRenderer", NodeShape::PlaylistPanelVideoRenderer, ShapeKind::Video, VIDEO),
    entry("videoWithContextRenderer", NodeShape::VideoWithContextRenderer, ShapeKind::Video, VIDEO),
    entry("endScreenVideoRenderer", NodeShape::EndScreenVideoRenderer, ShapeKind::Video, VIDEO),
    entry("watchCardCompactVideoRenderer", NodeShape::WatchCardCompactVideoRenderer, ShapeKind::Video, VIDEO),
    entry("movieRenderer", NodeShape::MovieRenderer, ShapeKind::Video, VIDEO),
    entry("lockupViewModel", NodeShape::LockupViewModel, ShapeKind::Video, LOCKUP),
    entry("reelItemRenderer", NodeShape::ReelItemRenderer, ShapeKind::Short, REEL_ITEM),
    entry("shortsLockupViewModel", NodeShape::ShortsLockupViewModel, ShapeKind::Short, SHORTS_LOCKUP),
    entry("shortsLockupViewModelV2", NodeShape::ShortsLockupViewModelV2, ShapeKind::Short, SHORTS_LOCKUP),
    wrapper("reelShelfRenderer", NodeShape::ReelShelfRenderer, ShapeKind::Short, "items"),
    entry("channelRenderer", NodeShape::ChannelRenderer, ShapeKind::Channel, CHANNEL),
    entry("gridChannelRenderer", NodeShape::GridChannelRenderer, ShapeKind::Channel, CHANNEL),
    entry("playlistRenderer", NodeShape::PlaylistRenderer, ShapeKind::Playlist, PLAYLIST),
    entry("gridPlaylistRenderer", NodeShape::GridPlaylistRenderer, ShapeKind::Playlist, PLAYLIST),
    entry("compactPlaylistRenderer", NodeShape::CompactPlaylistRenderer, ShapeKind::Playlist, PLAYLIST),
    entry("radioRenderer", NodeShape::RadioRenderer, ShapeKind::Playlist, RADIO),
    entry("compactRadioRenderer", NodeShape::CompactRadioRenderer, ShapeKind::Playlist, RADIO),
    entry("postRenderer", NodeShape::PostRenderer, ShapeKind::Post, POST),
    entry("backstagePostRenderer", NodeShape::BackstagePostRenderer, ShapeKind::Post, POST),
    entry("commentThreadRenderer", NodeShape::CommentThreadRenderer, ShapeKind::Comment, COMMENT_THREAD),
    entry("commentRenderer", NodeShape::CommentRenderer, ShapeKind::Comment, COMMENT),
    entry("commentViewModel", NodeShape::CommentViewModel, ShapeKind::Comment, FieldPaths::NONE),
    entry(
        "commentsEntryPointHeaderRenderer",
        NodeShape::CommentsEntryPointHeaderRenderer,
        ShapeKind::Comment,
        COMMENTS_TEASER,
    ),
    wrapper("richItemRenderer", NodeShape::RichItemRenderer, ShapeKind::Container, "content"),
    wrapper("richSectionRenderer", NodeShape::RichSectionRenderer, ShapeKind::Container, "content"),
];

/// All registry entries.
pub fn registry() -> &'static [RuleEntry] {
    RULES
}

/// Look up a registered tag.
pub fn lookup(tag: &str) -> Option<&'static RuleEntry> {
    RULES.iter().find(|rule| rule.tag == tag)
}

/// Does the key follow the renderer / view-model naming convention?
///
/// A trailing version suffix (`V2`) is ignored.
pub fn is_shape_key(key: &str) -> bool {
    let base = key.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = if base.len() < key.len() {
        base.strip_suffix('V').unwrap_or(key)
    } else {
        key
    };
    base.ends_with("Renderer") || base.ends_with("ViewModel")
}

impl NodeShape {
    /// Classify an object key. `None` for keys that are not shape tags at all.
    pub fn from_key(key: &str) -> Option<Self> {
        if !is_shape_key(key) {
            return None;
        }
        Some(lookup(key).map_or(Self::Unknown, |rule| rule.shape))
    }

    pub fn rule(self) -> Option<&'static RuleEntry> {
        RULES.iter().find(|rule| rule.shape == self)
    }

    pub fn kind(self) -> Option<ShapeKind> {
        self.rule().map(|rule| rule.kind)
    }

    pub fn is_shorts(self) -> bool {
        self.kind() == Some(ShapeKind::Short)
    }

    pub fn is_comment(self) -> bool {
        self.kind() == Some(ShapeKind::Comment)
    }
}

// =============================================================================
// Field Extraction
// =============================================================================

/// Fields read from one shape body. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// Primary channel first, then any extra channels named in the byline
    pub channels: Vec<ChannelIdentity>,
    pub comment_text: String,
}

fn pick_text(body: &Value, paths: &[&str], fallback: Option<&[&str]>) -> Option<String> {
    first_text(body, paths).or_else(|| fallback.and_then(|paths| first_text(body, paths)))
}

fn pick_string(body: &Value, paths: &[&str], fallback: Option<&[&str]>) -> Option<String> {
    first_string(body, paths)
        .or_else(|| first_text(body, paths))
        .or_else(|| fallback.and_then(|paths| first_string(body, paths)))
}

/// Every channel named by a run list, when runs carry their own browse endpoints.
fn byline_identities(body: &Value, paths: &[&str]) -> Vec<ChannelIdentity> {
    let runs = paths
        .iter()
        .filter_map(|path| get_path(body, path))
        .find_map(|value| value.get("runs").and_then(Value::as_array));

    let Some(runs) = runs else {
        return Vec::new();
    };

    runs.iter()
        .filter_map(|run| {
            let endpoint = get_path(run, "navigationEndpoint.browseEndpoint")?;
            let name = run.get("text").and_then(Value::as_str).map(str::to_string);
            let id = endpoint.get("browseId").and_then(Value::as_str).map(str::to_string);
            let url = endpoint
                .get("canonicalBaseUrl")
                .and_then(Value::as_str)
                .map(str::to_string);
            let identity = ChannelIdentity::from_parts(name, id, url);
            (!identity.is_empty()).then_some(identity)
        })
        .collect()
}

/// Read every field of a shape body.
///
/// The same rule produces the same result wherever the body sits in the
/// payload (initial page data or a continuation response).
pub fn extract_fields(rule: &RuleEntry, body: &Value) -> ExtractedFields {
    let fields = &rule.fields;
    let fallback = match rule.kind {
        ShapeKind::Comment | ShapeKind::Container => None,
        _ => Some(&FALLBACK),
    };

    let video_id = pick_string(body, fields.video_id, fallback.map(|f| f.video_id)).unwrap_or_default();
    let title = pick_text(body, fields.title, fallback.map(|f| f.title)).unwrap_or_default();
    let description =
        pick_text(body, fields.description, fallback.map(|f| f.description)).unwrap_or_default();
    let comment_text = pick_text(body, fields.comment_text, None).unwrap_or_default();

    let name_paths = fallback.map(|f| f.channel_name);
    let name = pick_text(body, fields.channel_name, name_paths);
    let id = pick_string(body, fields.channel_id, fallback.map(|f| f.channel_id));
    let url = pick_string(body, fields.channel_url, fallback.map(|f| f.channel_url));

    let mut channels = Vec::new();
    let primary = ChannelIdentity::from_parts(name, id, url);
    if !primary.is_empty() {
        channels.push(primary);
    }

    let byline_paths = if fields.channel_name.is_empty() {
        name_paths.unwrap_or(&[])
    } else {
        fields.channel_name
    };
    let byline = byline_identities(body, byline_paths);
    if byline.len() > 1 {
        for identity in byline {
            if !channels.contains(&identity) {
                channels.push(identity);
            }
        }
    }

    ExtractedFields {
        video_id,
        title,
        description,
        channels,
        comment_text,
    }
}
