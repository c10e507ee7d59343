//! Entity kinds and their property schema.
//!
//! Every entity kind declares a fixed set of properties. A property is either
//! a text attribute, an owned child, an ordered list of owned children, or an
//! ordered list of references to entities owned elsewhere. Ownership drives
//! containment edges in the document graph and the reach of `deep_delete`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Kinds ───────────────────────────────────────────────────────────────

/// The `type` tag of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Root of the document. Exactly one per document, never created by payloads.
    Document,
    Panel,
    Image,
    Paragraph,
    File,
    Resource,
    KeywordGroup,
    Keyword,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Document => "document",
            EntityKind::Panel => "panel",
            EntityKind::Image => "image",
            EntityKind::Paragraph => "paragraph",
            EntityKind::File => "file",
            EntityKind::Resource => "resource",
            EntityKind::KeywordGroup => "keyword-group",
            EntityKind::Keyword => "keyword",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "document" => EntityKind::Document,
            "panel" => EntityKind::Panel,
            "image" => EntityKind::Image,
            "paragraph" => EntityKind::Paragraph,
            "file" => EntityKind::File,
            "resource" => EntityKind::Resource,
            "keyword-group" => EntityKind::KeywordGroup,
            "keyword" => EntityKind::Keyword,
            _ => return None,
        })
    }

    /// Prefix used for generated ids (`keyword_group_4`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::KeywordGroup => "keyword_group",
            other => other.as_str(),
        }
    }

    /// All properties this kind declares, in canonical order.
    pub fn schema(&self) -> &'static [PropertySpec] {
        match self {
            EntityKind::Document => DOCUMENT,
            EntityKind::Panel => PANEL,
            EntityKind::Image => IMAGE,
            EntityKind::Paragraph => PARAGRAPH,
            EntityKind::File => FILE,
            EntityKind::Resource => RESOURCE,
            EntityKind::KeywordGroup => KEYWORD_GROUP,
            EntityKind::Keyword => KEYWORD,
        }
    }

    /// Look up the spec of one property, if this kind declares it.
    pub fn spec(&self, property: Property) -> Option<&'static PropertySpec> {
        self.schema().iter().find(|s| s.property == property)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Properties ──────────────────────────────────────────────────────────

/// Property names shared by all kinds. Serialized in the payload spelling
/// (`mimeType`, `keywords`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    Panels,
    Files,
    Resources,
    Image,
    Legend,
    Keywords,
    Src,
    MimeType,
    Url,
    Title,
    Name,
    Href,
    Content,
}

impl Property {
    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Panels => "panels",
            Property::Files => "files",
            Property::Resources => "resources",
            Property::Image => "image",
            Property::Legend => "legend",
            Property::Keywords => "keywords",
            Property::Src => "src",
            Property::MimeType => "mimeType",
            Property::Url => "url",
            Property::Title => "title",
            Property::Name => "name",
            Property::Href => "href",
            Property::Content => "content",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "panels" => Property::Panels,
            "files" => Property::Files,
            "resources" => Property::Resources,
            "image" => Property::Image,
            "legend" => Property::Legend,
            "keywords" => Property::Keywords,
            "src" => Property::Src,
            "mimeType" => Property::MimeType,
            "url" => Property::Url,
            "title" => Property::Title,
            "name" => Property::Name,
            "href" => Property::Href,
            "content" => Property::Content,
            _ => return None,
        })
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Specs ───────────────────────────────────────────────────────────────

/// Value shape of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// Plain string attribute.
    Text,
    /// A single owned child entity of one of the given kinds.
    Child(&'static [EntityKind]),
    /// Ordered list of owned children.
    Children(&'static [EntityKind]),
    /// Ordered list of references to entities owned elsewhere.
    References(&'static [EntityKind]),
}

impl PropertyType {
    pub fn is_list(&self) -> bool {
        matches!(self, PropertyType::Children(_) | PropertyType::References(_))
    }

    /// Whether values of this property are owned by the entity declaring it.
    pub fn owns(&self) -> bool {
        matches!(self, PropertyType::Child(_) | PropertyType::Children(_))
    }

    /// Whether an entity of `kind` may be stored in this property.
    pub fn accepts(&self, kind: EntityKind) -> bool {
        match self {
            PropertyType::Text => false,
            PropertyType::Child(kinds)
            | PropertyType::Children(kinds)
            | PropertyType::References(kinds) => kinds.contains(&kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub property: Property,
    pub ty: PropertyType,
    /// Payloads must provide this property.
    pub required: bool,
}

impl PropertySpec {
    const fn text(property: Property) -> Self {
        Self {
            property,
            ty: PropertyType::Text,
            required: false,
        }
    }

    const fn child(property: Property, kinds: &'static [EntityKind]) -> Self {
        Self {
            property,
            ty: PropertyType::Child(kinds),
            required: true,
        }
    }

    const fn children(property: Property, kinds: &'static [EntityKind]) -> Self {
        Self {
            property,
            ty: PropertyType::Children(kinds),
            required: false,
        }
    }

    const fn references(property: Property, kinds: &'static [EntityKind]) -> Self {
        Self {
            property,
            ty: PropertyType::References(kinds),
            required: false,
        }
    }
}

const DOCUMENT: &[PropertySpec] = &[
    PropertySpec::children(Property::Panels, &[EntityKind::Panel]),
    PropertySpec::children(Property::Files, &[EntityKind::File]),
    PropertySpec::children(Property::Resources, &[EntityKind::Resource]),
];

const PANEL: &[PropertySpec] = &[
    PropertySpec::text(Property::Title),
    PropertySpec::child(Property::Image, &[EntityKind::Image]),
    PropertySpec::children(Property::Legend, &[EntityKind::Paragraph]),
    PropertySpec::children(Property::Keywords, &[EntityKind::KeywordGroup]),
    PropertySpec::references(Property::Files, &[EntityKind::File]),
    PropertySpec::references(Property::Resources, &[EntityKind::Resource]),
];

const IMAGE: &[PropertySpec] = &[
    PropertySpec::text(Property::Src),
    PropertySpec::text(Property::MimeType),
];

const PARAGRAPH: &[PropertySpec] = &[PropertySpec::text(Property::Content)];

const FILE: &[PropertySpec] = &[
    PropertySpec::text(Property::Title),
    PropertySpec::text(Property::Src),
    PropertySpec::text(Property::MimeType),
    PropertySpec::text(Property::Url),
    PropertySpec::children(Property::Legend, &[EntityKind::Paragraph]),
];

const RESOURCE: &[PropertySpec] = &[
    PropertySpec::text(Property::Title),
    PropertySpec::text(Property::Href),
    PropertySpec::children(Property::Legend, &[EntityKind::Paragraph]),
];

const KEYWORD_GROUP: &[PropertySpec] = &[
    PropertySpec::text(Property::Name),
    PropertySpec::children(Property::Keywords, &[EntityKind::Keyword]),
];

const KEYWORD: &[PropertySpec] = &[PropertySpec::text(Property::Content)];
