use super::picture::Picture;
use crate::models::profile::{EducationEntry, Profile, WorkEntry};
use crate::models::user::PublicUser;

pub const TITLE: &str = "User Profile";
pub const NOT_AVAILABLE: &str = "N/A";
pub const EMPTY_VALUE: &str = "—";
pub const NO_EXPERIENCE: &str = "No experience added yet.";
pub const NO_EDUCATION: &str = "No education added yet.";

/// One vertical element of the page, in drawing order.
pub enum Block {
    Title(&'static str),
    Rule,
    Picture(Picture),
    /// Bold label followed by a regular value on the same line.
    Field { label: &'static str, value: String },
    Heading(&'static str),
    EntryTitle(String),
    Note(&'static str),
}

/// The resolved content of a profile resume. Every missing value has already
/// been replaced by its fallback, so painting never sees an absent field.
pub struct ProfileDocument {
    pub blocks: Vec<Block>,
}

fn or_not_available(v: Option<&str>) -> String {
    match v.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn or_dash(v: &str) -> String {
    match v.trim() {
        "" => EMPTY_VALUE.to_string(),
        s => s.to_string(),
    }
}

fn work_blocks(entries: &[WorkEntry]) -> Vec<Block> {
    if entries.is_empty() {
        return vec![Block::Note(NO_EXPERIENCE)];
    }
    let mut blocks = Vec::with_capacity(entries.len() * 3);
    for (i, w) in entries.iter().enumerate() {
        let company = match w.company.trim() {
            "" => "Company",
            c => c,
        };
        blocks.push(Block::EntryTitle(format!("{}. {company}", i + 1)));
        blocks.push(Block::Field { label: "Position", value: or_dash(&w.position) });
        blocks.push(Block::Field { label: "Years", value: or_dash(&w.years) });
    }
    blocks
}

fn education_blocks(entries: &[EducationEntry]) -> Vec<Block> {
    if entries.is_empty() {
        return vec![Block::Note(NO_EDUCATION)];
    }
    let mut blocks = Vec::with_capacity(entries.len() * 3);
    for (i, e) in entries.iter().enumerate() {
        blocks.push(Block::EntryTitle(format!("{}. {}", i + 1, or_dash(&e.school))));
        blocks.push(Block::Field { label: "Degree", value: or_dash(&e.degree) });
        blocks.push(Block::Field { label: "Field of Study", value: or_dash(e.field_of_study()) });
    }
    blocks
}

impl ProfileDocument {
    pub fn build(profile: &Profile, user: Option<&PublicUser>, picture: Picture) -> Self {
        let mut blocks = vec![Block::Title(TITLE), Block::Rule, Block::Picture(picture)];

        blocks.push(Block::Field { label: "Name", value: or_not_available(user.map(|u| u.name.as_str())) });
        blocks.push(Block::Field {
            label: "Username",
            value: or_not_available(user.map(|u| u.username.as_str())),
        });
        blocks.push(Block::Field { label: "Email", value: or_not_available(user.map(|u| u.email.as_str())) });
        blocks.push(Block::Field { label: "Bio", value: profile.bio.clone() });
        blocks.push(Block::Field { label: "Current Post", value: profile.current_post.clone() });

        blocks.push(Block::Heading("Experience"));
        blocks.extend(work_blocks(&profile.past_work));
        blocks.push(Block::Heading("Education"));
        blocks.extend(education_blocks(&profile.education));
        blocks.push(Block::Rule);

        Self { blocks }
    }

    /// The document's text, one entry per block; rules and images are skipped.
    pub fn text_lines(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Title(t) | Block::Heading(t) | Block::Note(t) => Some(t.to_string()),
                Block::Field { label, value } => Some(format!("{label}: {value}")),
                Block::EntryTitle(t) => Some(t.clone()),
                Block::Picture(p) => p.placeholder().map(str::to_string),
                Block::Rule => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_profile() -> Profile {
        Profile {
            id: "p1".into(),
            user_id: "u1".into(),
            bio: String::new(),
            current_post: String::new(),
            past_work: Vec::new(),
            education: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user() -> PublicUser {
        PublicUser {
            id: "u1".into(),
            name: "Ada".into(),
            username: "ada".into(),
            email: "ada@example.org".into(),
            profile_picture: "default.jpg".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lines(profile: &Profile, user: Option<&PublicUser>) -> Vec<String> {
        ProfileDocument::build(profile, user, Picture::NotFound).text_lines()
    }

    #[test]
    fn empty_sequences_show_placeholders() {
        let lines = lines(&empty_profile(), Some(&user()));
        assert!(lines.contains(&NO_EXPERIENCE.to_string()));
        assert!(lines.contains(&NO_EDUCATION.to_string()));
        assert!(lines.contains(&"Bio: ".to_string()));
    }

    #[test]
    fn missing_user_fields_read_not_available() {
        let lines = lines(&empty_profile(), None);
        for label in ["Name", "Username", "Email"] {
            assert!(lines.contains(&format!("{label}: N/A")), "{label} missing in {lines:?}");
        }
        let mut blank = user();
        blank.name = "   ".into();
        let lines = self::lines(&empty_profile(), Some(&blank));
        assert!(lines.contains(&"Name: N/A".to_string()));
        assert!(lines.contains(&"Username: ada".to_string()));
    }

    #[test]
    fn sections_follow_the_fixed_order() {
        let lines = lines(&empty_profile(), Some(&user()));
        let pos = |needle: &str| lines.iter().position(|l| l.starts_with(needle)).unwrap();
        assert_eq!(pos(TITLE), 0);
        assert!(pos("(Profile picture") < pos("Name:"));
        assert!(pos("Name:") < pos("Username:"));
        assert!(pos("Email:") < pos("Bio:"));
        assert!(pos("Bio:") < pos("Current Post:"));
        assert!(pos("Current Post:") < pos("Experience"));
        assert!(pos("Experience") < pos("Education"));
    }

    #[test]
    fn entries_are_numbered_with_dash_defaults() {
        let mut profile = empty_profile();
        profile.past_work = vec![
            WorkEntry { company: "Acme".into(), position: "Engineer".into(), years: String::new() },
            WorkEntry::default(),
        ];
        profile.education = vec![EducationEntry::new("", "BSc", "")];
        let lines = lines(&profile, Some(&user()));

        assert!(lines.contains(&"1. Acme".to_string()));
        assert!(lines.contains(&"Position: Engineer".to_string()));
        assert!(lines.contains(&"Years: —".to_string()));
        assert!(lines.contains(&"2. Company".to_string()));
        assert!(lines.contains(&"Position: —".to_string()));
        assert!(lines.contains(&"1. —".to_string()));
        assert!(lines.contains(&"Degree: BSc".to_string()));
        assert!(lines.contains(&"Field of Study: —".to_string()));
        assert!(!lines.contains(&NO_EXPERIENCE.to_string()));
    }

    #[test]
    fn legacy_field_of_study_renders_like_canonical() {
        let legacy: EducationEntry =
            serde_json::from_str(r#"{"school":"MIT","degree":"BSc","filedOfStudy":"Physics"}"#).unwrap();
        let mut a = empty_profile();
        a.education = vec![legacy];
        let mut b = empty_profile();
        b.education = vec![EducationEntry::new("MIT", "BSc", "Physics")];

        let la = lines(&a, Some(&user()));
        assert_eq!(la, lines(&b, Some(&user())));
        assert!(la.contains(&"Field of Study: Physics".to_string()));
    }

    #[test]
    fn picture_outcome_is_reflected() {
        let doc = ProfileDocument::build(&empty_profile(), None, Picture::Unreadable);
        assert!(doc.text_lines().contains(&"(Error displaying profile picture)".to_string()));
    }
}
