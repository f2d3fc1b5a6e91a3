//! The fixed set of collections making up a portfolio.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    AboutFeature, AccessRequest, Certification, ContactMessage, CustomSection, Education,
    Profile, Project, Skill, WorkExperience,
};
use crate::error::AppError;
use crate::store::Document;

/// A collection kind: the profile plus its nine child record types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Profile,
    Skill,
    Education,
    WorkExperience,
    Certification,
    Project,
    CustomSection,
    AboutFeature,
    ContactMessage,
    AccessRequest,
}

impl CollectionKind {
    /// All kinds, profile first.
    pub fn all() -> &'static [CollectionKind] {
        &[
            CollectionKind::Profile,
            CollectionKind::Skill,
            CollectionKind::Education,
            CollectionKind::WorkExperience,
            CollectionKind::Certification,
            CollectionKind::Project,
            CollectionKind::CustomSection,
            CollectionKind::AboutFeature,
            CollectionKind::ContactMessage,
            CollectionKind::AccessRequest,
        ]
    }

    /// Kinds that reference a profile through the owner field.
    pub fn children() -> &'static [CollectionKind] {
        &Self::all()[1..]
    }

    /// Table name in the source database, reused as the collection name.
    pub fn default_name(&self) -> &'static str {
        match self {
            CollectionKind::Profile => "profile_info",
            CollectionKind::Skill => "skills",
            CollectionKind::Education => "education",
            CollectionKind::WorkExperience => "work_experience",
            CollectionKind::Certification => "certifications",
            CollectionKind::Project => "projects",
            CollectionKind::CustomSection => "custom_sections",
            CollectionKind::AboutFeature => "about_features",
            CollectionKind::ContactMessage => "contact_messages",
            CollectionKind::AccessRequest => "access_requests",
        }
    }

    /// Looks a kind up by collection name.
    pub fn from_name(name: &str) -> Option<CollectionKind> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.default_name() == name)
    }

    /// Fields that identify a record to a human, in preference order.
    pub fn label_fields(&self) -> &'static [&'static str] {
        match self {
            CollectionKind::Profile => &["username", "full_name", "email"],
            CollectionKind::Skill => &["name", "category"],
            CollectionKind::Education => &["degree", "institution"],
            CollectionKind::WorkExperience => &["position", "company"],
            CollectionKind::Certification => &["name", "issuer"],
            CollectionKind::Project => &["title"],
            CollectionKind::CustomSection => &["title", "section_type"],
            CollectionKind::AboutFeature => &["title"],
            CollectionKind::ContactMessage => &["name", "subject", "email"],
            CollectionKind::AccessRequest => &["email", "username", "status"],
        }
    }

    /// Checks that a document decodes into this kind's typed record.
    pub fn validate(&self, doc: &Document) -> Result<(), AppError> {
        match self {
            CollectionKind::Profile => doc.decode::<Profile>().map(drop),
            CollectionKind::Skill => doc.decode::<Skill>().map(drop),
            CollectionKind::Education => doc.decode::<Education>().map(drop),
            CollectionKind::WorkExperience => doc.decode::<WorkExperience>().map(drop),
            CollectionKind::Certification => doc.decode::<Certification>().map(drop),
            CollectionKind::Project => doc.decode::<Project>().map(drop),
            CollectionKind::CustomSection => doc.decode::<CustomSection>().map(drop),
            CollectionKind::AboutFeature => doc.decode::<AboutFeature>().map(drop),
            CollectionKind::ContactMessage => doc.decode::<ContactMessage>().map(drop),
            CollectionKind::AccessRequest => doc.decode::<AccessRequest>().map(drop),
        }
    }

    /// Short human label built from the document's label fields.
    pub fn describe(&self, doc: &Document) -> String {
        let parts: Vec<&str> = self
            .label_fields()
            .iter()
            .filter_map(|field| doc.get_str(field))
            .filter(|v| !v.is_empty())
            .collect();
        if parts.is_empty() {
            format!("<{}>", doc.id)
        } else {
            parts.join(" @ ")
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_name())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Unknown collection '{}'", s))
    }
}
