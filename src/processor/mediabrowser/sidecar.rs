//! MediaBrowser XML sidecar documents.

use std::path::Path;

use anyhow::Context;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::metadata::{EpisodeMetadata, MediaMetadata, Person, PersonRole};

/// Builds one document; empty values become empty elements.
struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    fn new(root: &str) -> anyhow::Result<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new(root)))?;
        Ok(Self { writer })
    }

    fn field<S: AsRef<str>>(&mut self, name: &str, value: Option<S>) -> anyhow::Result<()> {
        let value: Option<&str> = value.as_ref().map(|v| v.as_ref());
        match value.filter(|v| !v.is_empty()) {
            Some(text) => {
                self.writer.write_event(Event::Start(BytesStart::new(name)))?;
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
                self.writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            None => self.writer.write_event(Event::Empty(BytesStart::new(name)))?,
        }
        Ok(())
    }

    fn open(&mut self, name: &str) -> anyhow::Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> anyhow::Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn finish(mut self, root: &str) -> anyhow::Result<Vec<u8>> {
        self.close(root)?;
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// `|a|b|`, the list format MediaBrowser reads for multi-valued fields.
fn pipe_list<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let joined: Vec<&str> = values.into_iter().filter(|v| !v.is_empty()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(format!("|{}|", joined.join("|")))
    }
}

fn people_with(people: &[Person], role: PersonRole) -> impl Iterator<Item = &str> {
    people
        .iter()
        .filter(move |p| p.role == role)
        .map(|p| p.name.as_str())
}

fn rating(value: Option<f64>) -> Option<String> {
    value.filter(|r| *r > 0.0).map(|r| format!("{r:.1}"))
}

/// `series.xml` for a series directory.
pub fn series_document(meta: &MediaMetadata) -> anyhow::Result<Vec<u8>> {
    let mut doc = XmlDocument::new("Series")?;
    doc.field("id", meta.provider_ids.get("tmdb").map(String::as_str))?;
    doc.field("Overview", meta.overview.as_deref())?;
    doc.field("SeriesName", Some(&meta.title))?;
    doc.field(
        "Actors",
        pipe_list(people_with(&meta.people, PersonRole::Actor)).as_deref(),
    )?;
    doc.field("Genre", pipe_list(meta.genres.iter().map(String::as_str)).as_deref())?;
    doc.field("ContentRating", meta.content_rating.as_deref())?;
    doc.field("Runtime", meta.runtime_minutes.map(|m| m.to_string()).as_deref())?;
    doc.field("Rating", rating(meta.community_rating).as_deref())?;
    doc.field("Status", meta.status.as_deref())?;
    doc.field("Network", meta.networks.first().map(String::as_str))?;
    doc.field("FirstAired", meta.premiere_date.as_deref())?;
    doc.field("IMdbId", meta.provider_ids.get("imdb").map(String::as_str))?;
    doc.finish("Series")
}

/// `metadata/<stem>.xml` for an episode file.
pub fn episode_document(episode: &EpisodeMetadata) -> anyhow::Result<Vec<u8>> {
    let mut doc = XmlDocument::new("Item")?;
    doc.field("ID", Some(&episode.id))?;
    doc.field(
        "Director",
        pipe_list(people_with(&episode.people, PersonRole::Director)).as_deref(),
    )?;
    doc.field("EpisodeID", Some(&episode.id))?;
    doc.field("EpisodeName", episode.name.as_deref())?;
    doc.field("EpisodeNumber", Some(&episode.episode_number.to_string()))?;
    doc.field("FirstAired", episode.air_date.as_deref())?;
    doc.field(
        "GuestStars",
        pipe_list(people_with(&episode.people, PersonRole::GuestStar)).as_deref(),
    )?;
    doc.field("Overview", episode.overview.as_deref())?;
    doc.field("ProductionCode", episode.production_code.as_deref())?;
    doc.field(
        "Writer",
        pipe_list(people_with(&episode.people, PersonRole::Writer)).as_deref(),
    )?;
    doc.field("SeasonNumber", Some(&episode.season_number.to_string()))?;
    doc.field("SeriesID", Some(&episode.series_id))?;
    doc.field("Rating", rating(episode.community_rating).as_deref())?;
    doc.finish("Item")
}

/// `movie.xml` for a movie directory.
pub fn movie_document(meta: &MediaMetadata) -> anyhow::Result<Vec<u8>> {
    let mut doc = XmlDocument::new("Title")?;
    doc.field("LocalTitle", Some(&meta.title))?;
    doc.field("OriginalTitle", meta.original_title.as_deref())?;
    doc.field("Description", meta.overview.as_deref())?;
    doc.field("Tagline", meta.tagline.as_deref())?;
    doc.field("IMDBId", meta.provider_ids.get("imdb").map(String::as_str))?;
    doc.field("ProductionYear", meta.production_year.map(|y| y.to_string()).as_deref())?;
    doc.field("IMDBrating", rating(meta.community_rating).as_deref())?;

    doc.open("Persons")?;
    for person in &meta.people {
        let kind = match person.role {
            PersonRole::Actor => "Actor",
            PersonRole::Director => "Director",
            PersonRole::Writer => "Writer",
            PersonRole::GuestStar => "GuestStar",
        };
        doc.open("Person")?;
        doc.field("Type", Some(kind))?;
        doc.field("Name", Some(&person.name))?;
        if person.role == PersonRole::Actor {
            doc.field("Role", person.character.as_deref())?;
        }
        doc.close("Person")?;
    }
    doc.close("Persons")?;

    doc.open("Genres")?;
    for genre in &meta.genres {
        doc.field("Genre", Some(genre))?;
    }
    doc.close("Genres")?;

    doc.open("Studios")?;
    for studio in &meta.studios {
        doc.field("Studio", Some(studio))?;
    }
    doc.close("Studios")?;

    doc.field("Runtime", meta.runtime_minutes.map(|m| m.to_string()).as_deref())?;
    doc.field("Id", meta.provider_ids.get("tmdb").map(String::as_str))?;
    doc.field("Released", meta.premiere_date.as_deref())?;
    doc.field("Budget", meta.budget.map(|b| b.to_string()).as_deref())?;
    doc.finish("Title")
}

/// Write `bytes` to `path`, creating its directory when needed.
pub fn write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn series_fields() {
        let meta = MediaMetadata {
            title: "Law & Order".into(),
            genres: vec!["Crime".into(), "Drama".into()],
            networks: vec!["NBC".into()],
            community_rating: Some(7.25),
            provider_ids: HashMap::from([("tmdb".to_string(), "549".to_string())]),
            ..MediaMetadata::default()
        };
        let xml = text(series_document(&meta).unwrap());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<SeriesName>Law &amp; Order</SeriesName>"));
        assert!(xml.contains("<Genre>|Crime|Drama|</Genre>"));
        assert!(xml.contains("<Network>NBC</Network>"));
        assert!(xml.contains("<Rating>7.2</Rating>") || xml.contains("<Rating>7.3</Rating>"));
        assert!(xml.contains("<id>549</id>"));
        assert!(xml.contains("<Overview/>"));
    }

    #[test]
    fn episode_fields() {
        let episode = EpisodeMetadata {
            id: "62085".into(),
            series_id: "1425".into(),
            name: Some("The Review".into()),
            season_number: 1,
            episode_number: 2,
            people: vec![
                Person { name: "A".into(), role: PersonRole::Director, character: None },
                Person { name: "B".into(), role: PersonRole::Writer, character: None },
                Person { name: "C".into(), role: PersonRole::Writer, character: None },
            ],
            ..EpisodeMetadata::default()
        };
        let xml = text(episode_document(&episode).unwrap());

        assert!(xml.contains("<EpisodeName>The Review</EpisodeName>"));
        assert!(xml.contains("<EpisodeNumber>2</EpisodeNumber>"));
        assert!(xml.contains("<SeasonNumber>1</SeasonNumber>"));
        assert!(xml.contains("<Director>|A|</Director>"));
        assert!(xml.contains("<Writer>|B|C|</Writer>"));
        assert!(xml.contains("<GuestStars/>"));
        assert!(xml.contains("<SeriesID>1425</SeriesID>"));
    }

    #[test]
    fn movie_people_and_lists() {
        let meta = MediaMetadata {
            title: "Heat".into(),
            production_year: Some(1995),
            studios: vec!["Regency".into()],
            people: vec![
                Person {
                    name: "Al Pacino".into(),
                    role: PersonRole::Actor,
                    character: Some("Vincent Hanna".into()),
                },
                Person { name: "Michael Mann".into(), role: PersonRole::Director, character: None },
            ],
            ..MediaMetadata::default()
        };
        let xml = text(movie_document(&meta).unwrap());

        assert!(xml.contains("<LocalTitle>Heat</LocalTitle>"));
        assert!(xml.contains("<ProductionYear>1995</ProductionYear>"));
        assert!(xml.contains("<Role>Vincent Hanna</Role>"));
        assert!(xml.contains("<Type>Director</Type>"));
        assert!(xml.contains("<Studio>Regency</Studio>"));
        assert!(xml.contains("<Genres/>") || xml.contains("<Genres>"));
    }

    #[test]
    fn pipe_list_skips_empty_values() {
        assert_eq!(pipe_list(["a", "", "b"]).as_deref(), Some("|a|b|"));
        assert_eq!(pipe_list(Vec::<&str>::new()), None);
    }

    #[test]
    fn write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata").join("ep.xml");
        write(&path, b"<Item/>").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"<Item/>");
    }
}
