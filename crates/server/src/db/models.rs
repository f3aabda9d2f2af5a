use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role {
    Citizen => "CITIZEN",
    Admin => "ADMIN",
});

text_enum!(Category {
    Roads => "ROADS",
    Waste => "WASTE",
    Safety => "SAFETY",
    Lighting => "LIGHTING",
    Other => "OTHER",
});

text_enum!(Status {
    New => "NEW",
    InProgress => "IN_PROGRESS",
    Resolved => "RESOLVED",
});

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: String,
}

/// The public view of a user embedded in reports and comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

/// A report joined with its (optional) author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: Status,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub image_data: Option<String>,
    pub audio_data: Option<String>,
    pub upvotes: i64,
    pub anonymous: bool,
    pub is_archived: bool,
    pub created_at: String,
    pub updated_at: String,
    pub user_id: Option<String>,
    pub author_email: Option<String>,
    pub author_role: Option<Role>,
    pub author_created_at: Option<String>,
}

impl ReportRow {
    pub fn author(&self) -> Option<UserSummary> {
        match (
            &self.user_id,
            &self.author_email,
            self.author_role,
            &self.author_created_at,
        ) {
            (Some(id), Some(email), Some(role), Some(created_at)) => Some(UserSummary {
                id: id.clone(),
                email: email.clone(),
                role,
                created_at: created_at.clone(),
            }),
            _ => None,
        }
    }
}

/// A comment joined with its author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub report_id: String,
    pub user_id: String,
    pub author_email: String,
    pub author_role: Role,
    pub author_created_at: String,
}

impl CommentRow {
    pub fn author(&self) -> UserSummary {
        UserSummary {
            id: self.user_id.clone(),
            email: self.author_email.clone(),
            role: self.author_role,
            created_at: self.author_created_at.clone(),
        }
    }
}

/// Columns selected for a `ReportRow`; callers add `FROM reports r LEFT JOIN users u ...`.
pub const REPORT_COLUMNS: &str = r#"
    r.id, r.title, r.description, r.category, r.status, r.lat, r.lng, r.address,
    r.image_data, r.audio_data, r.upvotes, r.anonymous, r.is_archived,
    r.created_at, r.updated_at, r.user_id,
    u.email AS author_email, u.role AS author_role, u.created_at AS author_created_at
"#;

pub const COMMENT_COLUMNS: &str = r#"
    c.id, c.text, c.created_at, c.report_id, c.user_id,
    u.email AS author_email, u.role AS author_role, u.created_at AS author_created_at
"#;
