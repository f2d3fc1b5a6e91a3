//! Child records owned by a profile through `user_id`.
//!
//! Every record shares the same ownership fields, so they are declared with
//! `child_record!`, which appends `user_id`, `display_order` and a
//! flattened `extra` map for fields the platform added later.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Declares a child record struct with the shared ownership fields.
macro_rules! child_record {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        pub struct $name {
            /// Owner identifier of the profile this record belongs to.
            pub user_id: Option<String>,
            /// Advisory position within the owner's list; not unique.
            pub display_order: Option<i64>,
            $($(#[$fmeta])* pub $field: $ty,)*
            #[serde(flatten)]
            pub extra: JsonMap<String, JsonValue>,
        }
    };
}

child_record!(
    /// A skill shown on the resume page.
    Skill {
        name: Option<String>,
        category: Option<String>,
        icon: Option<String>,
    }
);

child_record!(
    /// An education timeline entry.
    Education {
        institution: Option<String>,
        degree: Option<String>,
        field_of_study: Option<String>,
        location: Option<String>,
        start_date: Option<String>,
        /// `None` while ongoing.
        end_date: Option<String>,
        description: Option<String>,
    }
);

child_record!(
    /// A work experience timeline entry.
    WorkExperience {
        company: Option<String>,
        position: Option<String>,
        location: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
        is_current: Option<bool>,
        description: Option<String>,
    }
);

child_record!(
    Certification {
        name: Option<String>,
        issuer: Option<String>,
        issue_date: Option<String>,
        expiry_date: Option<String>,
        credential_id: Option<String>,
        credential_url: Option<String>,
    }
);

child_record!(
    /// A portfolio project.
    Project {
        title: Option<String>,
        description: Option<String>,
        image_url: Option<String>,
        project_url: Option<String>,
        github_url: Option<String>,
        technologies: Option<Vec<String>>,
        featured: Option<bool>,
    }
);

child_record!(
    /// A free-form section appended to the about page.
    CustomSection {
        title: Option<String>,
        content: Option<String>,
        section_type: Option<String>,
    }
);

child_record!(
    AboutFeature {
        title: Option<String>,
        description: Option<String>,
        icon: Option<String>,
    }
);

child_record!(
    /// A message left through the public contact form.
    ContactMessage {
        name: Option<String>,
        email: Option<String>,
        subject: Option<String>,
        message: Option<String>,
        is_read: Option<bool>,
    }
);

child_record!(
    /// A request for an account, approved by an admin.
    AccessRequest {
        email: Option<String>,
        full_name: Option<String>,
        username: Option<String>,
        message: Option<String>,
        status: Option<String>,
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_record_shared_fields() {
        let skill: Skill = serde_json::from_value(json!({
            "user_id": "u1",
            "display_order": 2,
            "name": "Rust",
            "proficiency": 90
        }))
        .unwrap();

        assert_eq!(skill.user_id.as_deref(), Some("u1"));
        assert_eq!(skill.display_order, Some(2));
        assert_eq!(skill.name.as_deref(), Some("Rust"));
        assert_eq!(skill.extra.get("proficiency"), Some(&json!(90)));
    }

    #[test]
    fn test_project_technologies_must_be_strings() {
        let ok: Result<Project, _> =
            serde_json::from_value(json!({"technologies": ["rust", "tokio"]}));
        assert_eq!(ok.unwrap().technologies.unwrap().len(), 2);

        let bad: Result<Project, _> = serde_json::from_value(json!({"technologies": [1, 2]}));
        assert!(bad.is_err());
    }
}
