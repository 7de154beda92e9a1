use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }
}

/// A vocabulary entry: Chinese script forms, readings, and the Vietnamese meaning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
  pub id: i64,
  pub owner_id: i64,
  pub traditional: Option<String>,
  pub simplified: Option<String>,
  pub pinyin: Option<String>,
  pub zhuyin: Option<String>,
  /// Taiwanese Hokkien reading (Tâi-lô)
  pub taiwanese: Option<String>,
  /// Vietnamese meaning; comma separated synonyms are accepted answers
  pub vietnamese: String,
  /// Sino-Vietnamese reading
  pub han_viet: Option<String>,
  pub example: Option<String>,
  pub example_translation: Option<String>,
  pub category_id: Option<i64>,
  pub difficulty: Difficulty,
  pub is_public: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Word {
  /// The headword shown to the learner, preferring the requested script
  pub fn headword(&self, prefer_simplified: bool) -> &str {
    let (first, second) = if prefer_simplified {
      (&self.simplified, &self.traditional)
    } else {
      (&self.traditional, &self.simplified)
    };
    first
      .as_deref()
      .or(second.as_deref())
      .unwrap_or(self.vietnamese.as_str())
  }
}

/// Fields accepted when creating or replacing a word
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordInput {
  #[serde(default)]
  pub traditional: Option<String>,
  #[serde(default)]
  pub simplified: Option<String>,
  #[serde(default)]
  pub pinyin: Option<String>,
  #[serde(default)]
  pub zhuyin: Option<String>,
  #[serde(default)]
  pub taiwanese: Option<String>,
  pub vietnamese: String,
  #[serde(default)]
  pub han_viet: Option<String>,
  #[serde(default)]
  pub example: Option<String>,
  #[serde(default)]
  pub example_translation: Option<String>,
  #[serde(default)]
  pub category_id: Option<i64>,
  #[serde(default)]
  pub difficulty: Difficulty,
  #[serde(default)]
  pub is_public: bool,
}

impl WordInput {
  /// Trim text fields and turn blanks into None
  pub fn normalized(mut self) -> Self {
    fn clean(value: &mut Option<String>) {
      *value = value
        .take()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    }
    clean(&mut self.traditional);
    clean(&mut self.simplified);
    clean(&mut self.pinyin);
    clean(&mut self.zhuyin);
    clean(&mut self.taiwanese);
    clean(&mut self.han_viet);
    clean(&mut self.example);
    clean(&mut self.example_translation);
    self.vietnamese = self.vietnamese.trim().to_string();
    self
  }

  /// Check required fields, returning a user facing message on failure
  pub fn validate(&self) -> Result<(), String> {
    if self.traditional.is_none() && self.simplified.is_none() {
      return Err("Either traditional or simplified form is required".to_string());
    }
    if self.vietnamese.is_empty() {
      return Err("Vietnamese meaning is required".to_string());
    }
    if self.vietnamese.chars().count() > 500 {
      return Err("Vietnamese meaning is too long".to_string());
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub id: i64,
  pub owner_id: i64,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub color: Option<String>,
  pub word_count: i64,
  pub created_at: DateTime<Utc>,
}

/// Lowercase ASCII slug; non-ASCII letters are transliterated where common
/// Vietnamese diacritics allow, everything else collapses into '-'
pub fn slugify(name: &str) -> String {
  let folded = crate::validation::strip_diacritics(&name.to_lowercase());
  let mut slug = String::with_capacity(folded.len());
  let mut last_dash = true;
  for c in folded.chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c);
      last_dash = false;
    } else if !last_dash {
      slug.push('-');
      last_dash = true;
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }
  if slug.is_empty() {
    // Pure Han names ("水果") have nothing ASCII left; use a short content hash
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(name.trim().as_bytes());
    slug = format!("c-{}", hex::encode(&hash[..4]));
  }
  slug
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSet {
  pub id: i64,
  pub owner_id: i64,
  pub name: String,
  pub description: Option<String>,
  pub is_public: bool,
  pub word_count: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Per-user aggregate over the words in a set
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WordSetStats {
  pub word_count: i64,
  pub learned_count: i64,
  pub mastered_count: i64,
  pub average_mastery: f64,
}
