use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_THUMBNAIL: &str = "/uploads/default-course.jpg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub chapters: u32,
    #[serde(default)]
    pub episodes: u32,
    #[serde(default)]
    pub video_url: String,
    #[serde(default = "default_thumbnail")]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The whole persisted aggregate: every course plus the id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDocument {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default = "first_id")]
    pub next_id: u64,
}

impl Default for CourseDocument {
    fn default() -> Self {
        Self {
            courses: Vec::new(),
            next_id: first_id(),
        }
    }
}

impl CourseDocument {
    /// Document written when no store file exists yet.
    pub fn seeded() -> Self {
        let sample = Course {
            id: 1,
            name: "Inteligencia Artificial IA".to_string(),
            category: "FINANZA".to_string(),
            chapters: 30,
            episodes: 90,
            video_url: "https://www.youtube.com/embed/dQw4w9WgXcQ".to_string(),
            thumbnail: DEFAULT_THUMBNAIL.to_string(),
            description: "Aprende los fundamentos de la Inteligencia Artificial".to_string(),
            featured: true,
            created_at: Utc::now(),
            updated_at: None,
        };

        Self {
            courses: vec![sample],
            next_id: 2,
        }
    }

    /// Raises `next_id` above every stored id. Returns true if it had to move.
    pub fn repair_next_id(&mut self) -> bool {
        let floor = self.courses.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        if self.next_id < floor {
            self.next_id = floor;
            true
        } else {
            false
        }
    }

    pub fn position(&self, id: u64) -> Option<usize> {
        self.courses.iter().position(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub chapters: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub episodes: Option<u32>,
    pub video_url: Option<String>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub featured: Option<bool>,
}

/// Partial update: a field that is present (and not `null`) replaces the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub chapters: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub episodes: Option<u32>,
    pub video_url: Option<String>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub featured: Option<bool>,
}

impl Course {
    pub fn from_request(id: u64, req: NewCourseRequest) -> Self {
        Self {
            id,
            name: req.name.unwrap_or_default(),
            category: req.category.unwrap_or_default(),
            chapters: req.chapters.unwrap_or(0),
            episodes: req.episodes.unwrap_or(0),
            video_url: req.video_url.unwrap_or_default(),
            thumbnail: req
                .thumbnail
                .filter(|t| !t.is_empty())
                .unwrap_or_else(default_thumbnail),
            description: req.description.unwrap_or_default(),
            featured: req.featured.unwrap_or(false),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn apply(&mut self, req: UpdateCourseRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(category) = req.category {
            self.category = category;
        }
        if let Some(chapters) = req.chapters {
            self.chapters = chapters;
        }
        if let Some(episodes) = req.episodes {
            self.episodes = episodes;
        }
        if let Some(video_url) = req.video_url {
            self.video_url = video_url;
        }
        if let Some(thumbnail) = req.thumbnail {
            self.thumbnail = thumbnail;
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(featured) = req.featured {
            self.featured = featured;
        }
        self.updated_at = Some(Utc::now());
    }
}

fn default_thumbnail() -> String {
    DEFAULT_THUMBNAIL.to_string()
}

fn first_id() -> u64 {
    1
}

/// Accepts `12`, `"12"`, `"12 chapters"`; anything without a leading integer
/// is treated as absent. Negative values are an error.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_leading_int(&s),
        Some(_) => None,
    };

    match parsed {
        None => Ok(None),
        Some(n) if n < 0 => Err(serde::de::Error::custom(format!(
            "expected a non-negative count, got {n}"
        ))),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("count {n} is too large"))),
    }
}

/// Accepts booleans and the strings `"true"` / `"false"`.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(s == "true"),
        Some(_) => Some(false),
    })
}

pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits.get(..end)?.parse().ok()?;

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u64) -> Course {
        Course::from_request(
            id,
            NewCourseRequest {
                name: Some("Rust".to_string()),
                category: Some("DEV".to_string()),
                chapters: Some(5),
                episodes: Some(10),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_create_defaults() {
        let course = Course::from_request(7, NewCourseRequest::default());
        assert_eq!(course.id, 7);
        assert_eq!(course.name, "");
        assert_eq!(course.chapters, 0);
        assert_eq!(course.thumbnail, DEFAULT_THUMBNAIL);
        assert!(!course.featured);
        assert!(course.updated_at.is_none());
    }

    #[test]
    fn test_lenient_fields() {
        let req: NewCourseRequest = serde_json::from_str(
            r#"{"name":"X","chapters":"12abc","episodes":null,"featured":"true"}"#,
        )
        .unwrap();
        assert_eq!(req.chapters, Some(12));
        assert_eq!(req.episodes, None);
        assert_eq!(req.featured, Some(true));

        let req: NewCourseRequest =
            serde_json::from_str(r#"{"chapters":"abc","featured":"yes"}"#).unwrap();
        assert_eq!(req.chapters, None);
        assert_eq!(req.featured, Some(false));

        assert!(serde_json::from_str::<NewCourseRequest>(r#"{"chapters":-3}"#).is_err());
    }

    #[test]
    fn test_apply_replaces_falsy_values() {
        let mut course = sample(1);
        course.featured = true;

        let req: UpdateCourseRequest =
            serde_json::from_str(r#"{"featured":false,"chapters":0,"description":""}"#).unwrap();
        course.apply(req);

        assert!(!course.featured);
        assert_eq!(course.chapters, 0);
        assert_eq!(course.description, "");
        assert_eq!(course.name, "Rust");
        assert!(course.updated_at.is_some());
    }

    #[test]
    fn test_repair_next_id() {
        let mut doc = CourseDocument {
            courses: vec![sample(4), sample(9)],
            next_id: 3,
        };
        assert!(doc.repair_next_id());
        assert_eq!(doc.next_id, 10);
        assert!(!doc.repair_next_id());
    }

    #[test]
    fn test_camel_case_wire_format() {
        let value = serde_json::to_value(CourseDocument::seeded()).unwrap();
        assert_eq!(value["nextId"], 2);
        assert_eq!(value["courses"][0]["videoUrl"], "https://www.youtube.com/embed/dQw4w9WgXcQ");
        assert!(value["courses"][0].get("createdAt").is_some());
        assert!(value["courses"][0].get("updatedAt").is_none());
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("  42"), Some(42));
        assert_eq!(parse_leading_int("-5x"), Some(-5));
        assert_eq!(parse_leading_int("x5"), None);
        assert_eq!(parse_leading_int(""), None);
    }
}
