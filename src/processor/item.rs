use metaproc_common::ItemKind;

use crate::facts::{Facts, EPISODE_NUMBER, MOVIE_TITLE, SEASON_NUMBER, SERIES_TITLE};
use crate::filter::PathEntry;

/// A node a metadata processor can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem<'a> {
    Series {
        title: &'a str,
    },
    Season {
        title: &'a str,
        season: u32,
    },
    Episode {
        title: &'a str,
        season: u32,
        episode: u32,
    },
    Movie {
        title: &'a str,
    },
}

/// What the facts of a node say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Item(MediaItem<'a>),
    /// Nothing to do, and nothing worth reporting.
    Ignored,
    /// The kind is known but the facts do not identify an item.
    Insufficient,
    /// The `type` fact is missing or names no known kind.
    UnknownKind(Option<&'a str>),
}

/// Classify a node from its facts.
///
/// TV directories are a series when only the title is known and a season
/// when the season number is known too; TV files are episodes. Movie
/// directories are movies, movie files are ignored.
pub fn classify<'a>(entry: &PathEntry, facts: &'a Facts) -> Classification<'a> {
    let kind = match facts.item_kind() {
        Some(Ok(kind)) => kind,
        Some(Err(other)) => return Classification::UnknownKind(Some(other)),
        None => return Classification::UnknownKind(None),
    };

    match kind {
        ItemKind::Tv => classify_tv(entry, facts),
        ItemKind::Movie if entry.is_file() => Classification::Ignored,
        ItemKind::Movie => match facts.known(MOVIE_TITLE) {
            Some(title) => Classification::Item(MediaItem::Movie { title }),
            None => Classification::Insufficient,
        },
    }
}

fn classify_tv<'a>(entry: &PathEntry, facts: &'a Facts) -> Classification<'a> {
    let Some(title) = facts.known(SERIES_TITLE) else {
        return Classification::Insufficient;
    };
    let season = facts.known(SEASON_NUMBER).map(str::parse::<u32>);
    let episode = facts.known(EPISODE_NUMBER).map(str::parse::<u32>);

    let item = match (entry.is_file(), season, episode) {
        (true, Some(Ok(season)), Some(Ok(episode))) => MediaItem::Episode {
            title,
            season,
            episode,
        },
        (false, None, None) => MediaItem::Series { title },
        (false, Some(Ok(season)), None) => MediaItem::Season { title, season },
        _ => return Classification::Insufficient,
    };
    Classification::Item(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::TYPE;

    fn facts(pairs: &[(&str, &str)]) -> Facts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn tv_nodes() {
        let series = facts(&[(TYPE, "tv"), (SERIES_TITLE, "Entourage")]);
        assert_eq!(
            classify(&PathEntry::directory("/tv/Entourage"), &series),
            Classification::Item(MediaItem::Series { title: "Entourage" })
        );

        let season = facts(&[(TYPE, "tv"), (SERIES_TITLE, "Entourage"), (SEASON_NUMBER, "1")]);
        assert_eq!(
            classify(&PathEntry::directory("/tv/Entourage/Season 1"), &season),
            Classification::Item(MediaItem::Season { title: "Entourage", season: 1 })
        );

        let episode = facts(&[
            (TYPE, "tv"),
            (SERIES_TITLE, "Entourage"),
            (SEASON_NUMBER, "1"),
            (EPISODE_NUMBER, "2"),
        ]);
        assert_eq!(
            classify(&PathEntry::file("/tv/Entourage/Season 1/e.mkv"), &episode),
            Classification::Item(MediaItem::Episode {
                title: "Entourage",
                season: 1,
                episode: 2
            })
        );
    }

    #[test]
    fn tv_with_gaps_is_insufficient() {
        let no_episode = facts(&[(TYPE, "tv"), (SERIES_TITLE, "Show"), (SEASON_NUMBER, "1")]);
        assert_eq!(
            classify(&PathEntry::file("/tv/Show/x.mkv"), &no_episode),
            Classification::Insufficient
        );

        let bad_number = facts(&[(TYPE, "tv"), (SERIES_TITLE, "Show"), (SEASON_NUMBER, "one")]);
        assert_eq!(
            classify(&PathEntry::directory("/tv/Show/One"), &bad_number),
            Classification::Insufficient
        );

        let no_title = facts(&[(TYPE, "tv")]);
        assert_eq!(
            classify(&PathEntry::directory("/tv/x"), &no_title),
            Classification::Insufficient
        );
    }

    #[test]
    fn movies() {
        let movie = facts(&[(TYPE, "movie"), (MOVIE_TITLE, "Heat")]);
        assert_eq!(
            classify(&PathEntry::directory("/movies/Heat"), &movie),
            Classification::Item(MediaItem::Movie { title: "Heat" })
        );
        assert_eq!(
            classify(&PathEntry::file("/movies/Heat/heat.mkv"), &movie),
            Classification::Ignored
        );
        assert_eq!(
            classify(&PathEntry::directory("/movies/x"), &facts(&[(TYPE, "movie")])),
            Classification::Insufficient
        );
    }

    #[test]
    fn unknown_kinds() {
        assert_eq!(
            classify(&PathEntry::directory("/x"), &facts(&[(TYPE, "music")])),
            Classification::UnknownKind(Some("music"))
        );
        assert_eq!(
            classify(&PathEntry::directory("/x"), &Facts::new()),
            Classification::UnknownKind(None)
        );
    }
}
