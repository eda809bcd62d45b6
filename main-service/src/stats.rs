//! View-count aggregation against the stats service.
//!
//! Published events are counted by hits on their public URI `/events/{id}`;
//! the id is parsed back out of the URI suffix when joining counts onto
//! events. A stats outage degrades to zero views and never fails the caller.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};

use afisha_stats_client::{EndpointHit, StatsClient, ViewStats};

pub struct StatsGateway {
    client: StatsClient,
    app: String,
}

impl StatsGateway {
    pub fn new(client: StatsClient, app: impl Into<String>) -> Self {
        Self {
            client,
            app: app.into(),
        }
    }

    /// Fire-and-forget hit recording for a public endpoint access.
    pub async fn record_hit(&self, uri: &str, ip: &str) {
        let hit = EndpointHit {
            app: self.app.clone(),
            uri: uri.to_string(),
            ip: ip.to_string(),
            timestamp: Utc::now().naive_utc(),
        };
        if let Err(err) = self.client.record_hit(&hit).await {
            tracing::warn!(uri, error = %err, "failed to record hit");
        }
    }

    /// Unique-ip view counts for the given `(event id, published_on)` pairs.
    /// The range starts at the earliest known publication date; with no
    /// published event there is nothing to count and no call is made.
    pub async fn views(&self, events: &[(i64, Option<NaiveDateTime>)]) -> HashMap<i64, i64> {
        let Some(start) = earliest_published(events) else {
            return HashMap::new();
        };
        let uris: Vec<String> = events.iter().map(|(id, _)| event_uri(*id)).collect();
        match self
            .client
            .stats(start, Utc::now().naive_utc(), &uris, true)
            .await
        {
            Ok(stats) => views_by_event_id(&stats),
            Err(err) => {
                tracing::warn!(error = %err, "stats query failed, serving zero views");
                HashMap::new()
            }
        }
    }
}

pub fn event_uri(event_id: i64) -> String {
    format!("/events/{event_id}")
}

pub fn earliest_published(events: &[(i64, Option<NaiveDateTime>)]) -> Option<NaiveDateTime> {
    events.iter().filter_map(|(_, published)| *published).min()
}

pub fn views_by_event_id(stats: &[ViewStats]) -> HashMap<i64, i64> {
    let mut views = HashMap::new();
    for stat in stats {
        if let Some(id) = stat
            .uri
            .rsplit('/')
            .next()
            .and_then(|part| part.parse::<i64>().ok())
        {
            views.insert(id, stat.hits);
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use afisha_stats_client::datetime;

    fn at(raw: &str) -> NaiveDateTime {
        datetime::parse(raw).unwrap()
    }

    #[test]
    fn builds_event_uris() {
        assert_eq!(event_uri(17), "/events/17");
    }

    #[test]
    fn earliest_published_skips_unpublished() {
        let events = vec![
            (1, None),
            (2, Some(at("2035-05-01 10:00:00"))),
            (3, Some(at("2035-04-01 10:00:00"))),
        ];
        assert_eq!(earliest_published(&events), Some(at("2035-04-01 10:00:00")));
        assert_eq!(earliest_published(&[(1, None)]), None);
        assert_eq!(earliest_published(&[]), None);
    }

    #[test]
    fn joins_counts_back_by_uri_suffix() {
        let stats = vec![
            ViewStats {
                app: "afisha".into(),
                uri: "/events/5".into(),
                hits: 12,
            },
            ViewStats {
                app: "afisha".into(),
                uri: "/events".into(),
                hits: 99,
            },
        ];
        let views = views_by_event_id(&stats);
        assert_eq!(views.get(&5), Some(&12));
        assert_eq!(views.len(), 1);
    }
}
