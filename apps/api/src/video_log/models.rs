use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::youtube::Thumbnail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(format!("{other} is not a video orientation")),
        }
    }
}

/// Who may read a profile's video log and summaries besides its owner.
/// Only `Public` opens it up; `Unlisted` is gated like `Private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Privacy {
    Public,
    Unlisted,
    Private,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "PUBLIC",
            Privacy::Unlisted => "UNLISTED",
            Privacy::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Privacy::Public),
            "UNLISTED" => Ok(Privacy::Unlisted),
            "PRIVATE" => Ok(Privacy::Private),
            other => Err(format!("{other} is not a valid option for privacy setting")),
        }
    }
}

/// Metadata of one uploaded practice video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLogEntry {
    /// YouTube video id.
    pub id: String,
    pub username: String,
    pub published: DateTime<Utc>,
    pub video_orientation: Orientation,
    pub title: String,
    pub description: String,
    pub is_monthly_progress: bool,
    pub thumbnails: HashMap<String, Thumbnail>,
    /// Owner's practice minutes logged strictly before `published`.
    pub minutes_of_guitar_practice: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub privacy: Privacy,
}

/// Free-text write-up for one month of practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
    pub year: i32,
    pub month: i32,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
}
