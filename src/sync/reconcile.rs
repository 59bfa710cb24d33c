use std::collections::HashSet;

use crate::feed::FeedItem;
use crate::storage::{ExistingEpisode, NewEpisode};

/// Computes the ordered list of new episodes to insert for a podcast.
///
/// Pure function over (existing episodes, feed items): no I/O, and
/// idempotent. Reconciling against an unchanged feed after inserting the
/// result yields an empty list.
///
/// Rules, applied per item in feed order:
///
/// - items without a title or without an enclosure URL are skipped;
/// - items whose lowercased title or audio URL matches a stored episode
///   are duplicates and skipped;
/// - the episode number is the feed's explicit number when present,
///   otherwise a running counter starting at max(existing) + 1;
/// - an item whose explicit number is already taken, by a stored episode
///   or by an item accepted earlier in the run, is skipped outright rather
///   than renumbered (the counter still advances). Feeds whose explicit
///   numbering overlaps earlier manual entries can therefore silently drop
///   items; this matches the marketplace's historical behavior and is kept
///   until product says otherwise;
/// - the counter always moves past every accepted number, so auto-assigned
///   numbers are never taken.
///
/// Durations are normalized to whole seconds via [`parse_duration`];
/// season defaults to 1.
pub fn reconcile(existing: &[ExistingEpisode], items: &[FeedItem]) -> Vec<NewEpisode> {
    let mut known_titles: HashSet<String> =
        existing.iter().map(|e| e.title.to_lowercase()).collect();
    // Tracks stored and run-accepted numbers. The counter is kept above
    // every number in this set, so only explicit feed numbers can collide,
    // and an explicit collision resolves the same way on a re-run (the
    // winning episode is stored by then), which keeps reconciliation
    // idempotent.
    let mut known_numbers: HashSet<i64> = existing.iter().map(|e| e.episode_number).collect();
    let mut known_urls: HashSet<String> = existing.iter().map(|e| e.audio_url.clone()).collect();

    let mut next_number = existing
        .iter()
        .map(|e| e.episode_number)
        .max()
        .unwrap_or(0)
        + 1;

    let mut accepted = Vec::new();

    for item in items {
        let (Some(title), Some(audio_url)) = (item.title.as_deref(), item.enclosure_url.as_deref())
        else {
            continue;
        };

        let title_key = title.to_lowercase();
        if known_titles.contains(&title_key) || known_urls.contains(audio_url) {
            continue;
        }

        let episode_number = item.episode_number.unwrap_or(next_number);
        if known_numbers.contains(&episode_number) {
            // Numbering collision: drop the item, advance the counter
            next_number += 1;
            continue;
        }

        accepted.push(NewEpisode {
            title: title.to_string(),
            description: item.description.clone(),
            audio_url: audio_url.to_string(),
            duration_seconds: item.duration_raw.as_deref().and_then(parse_duration),
            episode_number,
            season_number: item.season_number.unwrap_or(1),
            published_at: item.published_at,
        });

        known_titles.insert(title_key);
        known_urls.insert(audio_url.to_string());
        known_numbers.insert(episode_number);
        next_number = next_number.max(episode_number + 1);
    }

    accepted
}

/// Parses an iTunes duration string into whole seconds.
///
/// Supports `SS`, `MM:SS`, and `HH:MM:SS`. Anything else (empty, extra
/// segments, non-numeric, negative) yields `None`.
pub fn parse_duration(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut total: i64 = 0;
    for part in &parts {
        let n: i64 = part.trim().parse().ok()?;
        if n < 0 {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(n)?;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn stored(title: &str, number: i64, audio_url: &str) -> ExistingEpisode {
        ExistingEpisode {
            title: title.to_string(),
            episode_number: number,
            audio_url: audio_url.to_string(),
        }
    }

    fn item(title: &str, audio_url: &str) -> FeedItem {
        FeedItem {
            title: Some(title.to_string()),
            enclosure_url: Some(audio_url.to_string()),
            ..FeedItem::default()
        }
    }

    // ========================================================================
    // Duration Parsing
    // ========================================================================

    #[test]
    fn duration_seconds_only() {
        assert_eq!(parse_duration("90"), Some(90));
    }

    #[test]
    fn duration_minutes_seconds() {
        assert_eq!(parse_duration("1:30"), Some(90));
    }

    #[test]
    fn duration_hours_minutes_seconds() {
        assert_eq!(parse_duration("1:01:30"), Some(3690));
    }

    #[test]
    fn duration_invalid_inputs_are_none() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("   "), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("1:2:3:4"), None);
        assert_eq!(parse_duration("-90"), None);
        assert_eq!(parse_duration("1.5"), None);
    }

    #[test]
    fn duration_tolerates_whitespace() {
        assert_eq!(parse_duration(" 1:30 "), Some(90));
    }

    // ========================================================================
    // Deduplication
    // ========================================================================

    #[test]
    fn duplicate_title_is_skipped_case_insensitively() {
        let existing = vec![stored("The Pilot", 1, "https://a.example/1.mp3")];
        let items = vec![item("THE PILOT", "https://a.example/other.mp3")];

        assert!(reconcile(&existing, &items).is_empty());
    }

    #[test]
    fn duplicate_audio_url_is_skipped_regardless_of_title() {
        let existing = vec![stored("The Pilot", 1, "https://a.example/1.mp3")];
        let items = vec![item("A Brand New Title", "https://a.example/1.mp3")];

        assert!(reconcile(&existing, &items).is_empty());
    }

    #[test]
    fn duplicates_within_one_feed_are_collapsed() {
        let items = vec![
            item("Ep", "https://a.example/1.mp3"),
            item("ep", "https://a.example/2.mp3"),
            item("Other", "https://a.example/1.mp3"),
        ];

        let result = reconcile(&[], &items);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Ep");
    }

    // ========================================================================
    // Numbering
    // ========================================================================

    #[test]
    fn auto_numbering_continues_from_existing_max() {
        let existing = vec![
            stored("One", 1, "https://a.example/1.mp3"),
            stored("Two", 2, "https://a.example/2.mp3"),
            stored("Three", 3, "https://a.example/3.mp3"),
        ];
        let items = vec![item("Four", "https://a.example/4.mp3")];

        let result = reconcile(&existing, &items);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].episode_number, 4);
    }

    #[test]
    fn explicit_feed_number_is_used() {
        let mut it = item("Special", "https://a.example/s.mp3");
        it.episode_number = Some(100);

        let result = reconcile(&[], &[it]);
        assert_eq!(result[0].episode_number, 100);
    }

    #[test]
    fn explicit_number_collision_drops_item_and_advances_counter() {
        let existing = vec![stored("Manual Entry", 5, "https://a.example/manual.mp3")];

        let mut colliding = item("Collides", "https://a.example/c.mp3");
        colliding.episode_number = Some(5);
        let following = item("Follows", "https://a.example/f.mp3");

        let result = reconcile(&existing, &[colliding, following]);

        // Colliding item is dropped outright, not renumbered
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Follows");
        // Counter advanced past the collision: 6 was consumed, 7 assigned
        assert_eq!(result[0].episode_number, 7);
    }

    #[test]
    fn duplicate_explicit_numbers_in_one_feed_keep_only_the_first() {
        let mut alpha = item("Alpha", "https://a.example/alpha.mp3");
        alpha.episode_number = Some(5);
        let mut beta = item("Beta", "https://a.example/beta.mp3");
        beta.episode_number = Some(5);

        let result = reconcile(&[], &[alpha, beta]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Alpha");
        assert_eq!(result[0].episode_number, 5);
    }

    #[test]
    fn auto_number_never_reuses_an_explicit_number_from_the_same_run() {
        let mut explicit = item("Two", "https://a.example/2.mp3");
        explicit.episode_number = Some(2);
        let auto = item("Next", "https://a.example/next.mp3");

        let result = reconcile(&[], &[explicit, auto]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].episode_number, 2);
        assert_eq!(result[1].episode_number, 3);
    }

    #[test]
    fn season_defaults_to_one() {
        let result = reconcile(&[], &[item("Ep", "https://a.example/1.mp3")]);
        assert_eq!(result[0].season_number, 1);
    }

    #[test]
    fn explicit_season_is_kept() {
        let mut it = item("Ep", "https://a.example/1.mp3");
        it.season_number = Some(3);
        let result = reconcile(&[], &[it]);
        assert_eq!(result[0].season_number, 3);
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    #[test]
    fn mixed_feed_yields_only_the_new_item() {
        let existing = vec![stored("Known Episode", 1, "https://a.example/known.mp3")];

        let no_enclosure = FeedItem {
            title: Some("No Audio".to_string()),
            ..FeedItem::default()
        };
        let items = vec![
            item("known episode", "https://a.example/dup.mp3"),
            no_enclosure,
            item("Fresh", "https://a.example/fresh.mp3"),
        ];

        let result = reconcile(&existing, &items);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Fresh");
        assert_eq!(result[0].episode_number, 2);
    }

    #[test]
    fn accepted_items_carry_parsed_duration() {
        let mut it = item("Ep", "https://a.example/1.mp3");
        it.duration_raw = Some("1:30".to_string());
        let result = reconcile(&[], &[it]);
        assert_eq!(result[0].duration_seconds, Some(90));
    }

    #[test]
    fn unparseable_duration_becomes_null() {
        let mut it = item("Ep", "https://a.example/1.mp3");
        it.duration_raw = Some("about an hour".to_string());
        let result = reconcile(&[], &[it]);
        assert_eq!(result[0].duration_seconds, None);
    }

    #[test]
    fn rerun_on_unchanged_inputs_is_empty() {
        let items = vec![
            item("One", "https://a.example/1.mp3"),
            item("Two", "https://a.example/2.mp3"),
        ];
        let first = reconcile(&[], &items);
        assert_eq!(first.len(), 2);

        let grown: Vec<ExistingEpisode> = first
            .iter()
            .map(|e| ExistingEpisode {
                title: e.title.clone(),
                episode_number: e.episode_number,
                audio_url: e.audio_url.clone(),
            })
            .collect();

        assert!(reconcile(&grown, &items).is_empty());
    }

    // ========================================================================
    // Properties
    // ========================================================================

    fn arb_item() -> impl Strategy<Value = FeedItem> {
        (
            proptest::option::of("[a-z]{1,8}"),
            proptest::option::of("[a-z]{1,8}"),
            proptest::option::of(1i64..20),
        )
            .prop_map(|(title, slug, episode_number)| FeedItem {
                title,
                enclosure_url: slug.map(|s| format!("https://a.example/{}.mp3", s)),
                episode_number,
                ..FeedItem::default()
            })
    }

    proptest! {
        #[test]
        fn reconcile_is_idempotent(
            items in proptest::collection::vec(arb_item(), 0..12),
            seed_numbers in proptest::collection::hash_set(1i64..10, 0..4),
        ) {
            let existing: Vec<ExistingEpisode> = seed_numbers
                .iter()
                .map(|n| ExistingEpisode {
                    title: format!("seed {}", n),
                    episode_number: *n,
                    audio_url: format!("https://seed.example/{}.mp3", n),
                })
                .collect();

            let first = reconcile(&existing, &items);

            // Numbers are unique across the accepted batch and the seeds
            let mut numbers: HashSet<i64> = seed_numbers.clone();
            for episode in &first {
                prop_assert!(numbers.insert(episode.episode_number));
            }

            let mut grown = existing.clone();
            grown.extend(first.iter().map(|e| ExistingEpisode {
                title: e.title.clone(),
                episode_number: e.episode_number,
                audio_url: e.audio_url.clone(),
            }));

            prop_assert!(reconcile(&grown, &items).is_empty());
        }
    }
}
