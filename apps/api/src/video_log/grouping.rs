use chrono::Datelike;
use serde::Serialize;

use super::models::VideoLogEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoGroup {
    pub year: i32,
    pub month: u32,
    pub practice_recordings: Vec<VideoLogEntry>,
    pub progress_recordings: Vec<VideoLogEntry>,
}

impl VideoGroup {
    fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            practice_recordings: Vec::new(),
            progress_recordings: Vec::new(),
        }
    }

    fn push(&mut self, video: VideoLogEntry) {
        if video.is_monthly_progress {
            self.progress_recordings.push(video);
        } else {
            self.practice_recordings.push(video);
        }
    }
}

/// Splits videos (newest first) into calendar-month groups. A group opens
/// whenever the (year, month) of a video differs from the previous one, so
/// the input order is kept.
pub fn group_by_month(videos: Vec<VideoLogEntry>) -> Vec<VideoGroup> {
    let mut groups: Vec<VideoGroup> = Vec::new();

    for video in videos {
        let (year, month) = (video.published.year(), video.published.month());
        match groups.last_mut() {
            Some(last) if last.year == year && last.month == month => last.push(video),
            _ => {
                let mut group = VideoGroup::new(year, month);
                group.push(video);
                groups.push(group);
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::video_log::models::Orientation;

    fn video(id: &str, y: i32, m: u32, d: u32, progress: bool) -> VideoLogEntry {
        VideoLogEntry {
            id: id.to_string(),
            username: "me@example.com".into(),
            published: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
            video_orientation: Orientation::Landscape,
            title: id.to_string(),
            description: String::new(),
            is_monthly_progress: progress,
            thumbnails: HashMap::new(),
            minutes_of_guitar_practice: 0,
        }
    }

    #[test]
    fn test_groups_follow_month_boundaries() {
        let groups = group_by_month(vec![
            video("c", 2023, 2, 20, true),
            video("b", 2023, 2, 3, false),
            video("a", 2023, 1, 30, false),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].year, groups[0].month), (2023, 2));
        assert_eq!(groups[0].progress_recordings.len(), 1);
        assert_eq!(groups[0].practice_recordings[0].id, "b");
        assert_eq!((groups[1].year, groups[1].month), (2023, 1));
    }

    #[test]
    fn test_same_month_different_year_is_separate() {
        let groups = group_by_month(vec![
            video("b", 2023, 1, 5, false),
            video("a", 2022, 1, 5, false),
        ]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_no_videos_no_groups() {
        assert!(group_by_month(Vec::new()).is_empty());
    }
}
