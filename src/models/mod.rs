//! Domain models for the portfolio platform's stored records.

mod collection;
mod profile;
mod records;
mod timeline;

pub use collection::CollectionKind;
pub use profile::{Profile, ProfileStatus};
pub use records::{
    AboutFeature, AccessRequest, Certification, ContactMessage, CustomSection, Education,
    Project, Skill, WorkExperience,
};
pub use timeline::{sort_timeline, TimelineEntry};
