use beacon_db::Database;
use tracing::{error, info, warn};

use crate::{EnrichError, EnrichmentApi, NO_DESCRIPTION, NO_TRANSCRIPT};

/// Only the first ten videos per ticket receive full severity analysis;
/// beyond that only lightweight descriptions are generated (cost cutoff).
pub const FULL_ANALYSIS_MAX_VIDEOS: i64 = 10;

const KIND_VIDEO: &str = "video";

/// Enrich a freshly inserted video and fold the result into the ticket.
///
/// `video_count` is the ticket's video count including the new row. Within
/// the full-analysis window the latest report replaces the ticket's
/// aggregated analysis wholesale and its score overwrites the ticket
/// priority; past the window only the video's own description is updated
/// and the ticket priority is left untouched.
///
/// Best-effort throughout: enrichment or persistence failures are logged
/// and degrade to placeholders — the evidence row is already saved.
pub async fn enrich_video(
    api: &dyn EnrichmentApi,
    db: &Database,
    ticket_id: &str,
    bucket_ref: &str,
    video_count: i64,
) {
    if video_count <= FULL_ANALYSIS_MAX_VIDEOS {
        match api.analyze(bucket_ref).await {
            Ok(report) => {
                let json = match serde_json::to_string(&report) {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to serialize analysis for ticket {}: {}", ticket_id, e);
                        return;
                    }
                };
                if let Err(e) = db.set_ticket_analysis(ticket_id, &json, report.priority.score) {
                    error!("Failed to store analysis for ticket {}: {}", ticket_id, e);
                }
                if let Err(e) = db.update_media_transcript(
                    ticket_id,
                    KIND_VIDEO,
                    bucket_ref,
                    &report.summary.summary_en,
                    Some(&report.summary.summary_local),
                ) {
                    error!("Failed to store video summary for {}: {}", bucket_ref, e);
                }
                info!(
                    "Ticket {} analysis updated: priority {} (video {}/{})",
                    ticket_id, report.priority.score, video_count, FULL_ANALYSIS_MAX_VIDEOS
                );
            }
            Err(e) => {
                warn!("Video analysis failed for {}: {}", bucket_ref, e);
                set_transcript_fallback(db, ticket_id, bucket_ref, NO_DESCRIPTION);
            }
        }
    } else {
        // past the analysis window: description only, ticket priority untouched
        match api.describe(bucket_ref).await {
            Ok(description) => {
                if let Err(e) =
                    db.update_media_transcript(ticket_id, KIND_VIDEO, bucket_ref, &description, None)
                {
                    error!("Failed to store video description for {}: {}", bucket_ref, e);
                }
            }
            Err(e) => {
                warn!("Video description failed for {}: {}", bucket_ref, e);
                set_transcript_fallback(db, ticket_id, bucket_ref, NO_DESCRIPTION);
            }
        }
    }
}

/// Transcribe an audio clip, degrading to the placeholder on failure.
pub async fn transcript_or_placeholder(api: &dyn EnrichmentApi, bucket_ref: &str) -> String {
    match api.transcribe(bucket_ref).await {
        Ok(t) => t,
        Err(e) => {
            warn!("Transcription failed for {}: {}", bucket_ref, e);
            NO_TRANSCRIPT.to_string()
        }
    }
}

/// Describe an image, degrading to the placeholder on failure.
pub async fn description_or_placeholder(api: &dyn EnrichmentApi, bucket_ref: &str) -> String {
    match api.describe(bucket_ref).await {
        Ok(d) => d,
        Err(e) => {
            warn!("Description failed for {}: {}", bucket_ref, e);
            NO_DESCRIPTION.to_string()
        }
    }
}

fn set_transcript_fallback(db: &Database, ticket_id: &str, bucket_ref: &str, placeholder: &str) {
    if let Err(e) = db.update_media_transcript(ticket_id, KIND_VIDEO, bucket_ref, placeholder, None) {
        error!("Failed to store placeholder for {}: {}", bucket_ref, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::models::{BilingualSummary, CriticalInfo, PriorityReport, PriorityScore};
    use futures_util::future::BoxFuture;

    struct FakeApi {
        score: i64,
        fail_analyze: bool,
    }

    impl EnrichmentApi for FakeApi {
        fn transcribe<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<String, EnrichError>> {
            Box::pin(async { Ok("spoken words".to_string()) })
        }

        fn describe<'a>(&'a self, bucket_ref: &'a str) -> BoxFuture<'a, Result<String, EnrichError>> {
            Box::pin(async move { Ok(format!("description of {}", bucket_ref)) })
        }

        fn analyze<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<PriorityReport, EnrichError>> {
            Box::pin(async move {
                if self.fail_analyze {
                    return Err(EnrichError::Status(reqwest::StatusCode::BAD_GATEWAY));
                }
                Ok(PriorityReport {
                    critical: CriticalInfo {
                        is_fake: false,
                        threats: vec![],
                        location_text: None,
                        weapons: vec![],
                    },
                    priority: PriorityScore {
                        score: self.score,
                        reason_en: "r".into(),
                        reason_local: "r".into(),
                    },
                    summary: BilingualSummary {
                        summary_en: "summary en".into(),
                        summary_local: "summary local".into(),
                        confidence: 0.8,
                    },
                })
            })
        }
    }

    fn ticket_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "asha", "hash", "Asha", None).unwrap();
        db.create_ticket("t1", "u1", None, 28.6, 77.2, "2026-08-30 10:00:00")
            .unwrap();
        db
    }

    fn add_video(db: &Database, n: u32) {
        db.insert_media(
            &format!("m{}", n),
            "t1",
            "video",
            "https://cdn/v.mp4",
            &format!("bucket/v{}", n),
            "2026-08-30 10:01:00",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn third_video_gets_full_analysis() {
        let db = ticket_db();
        for n in 1..=3 {
            add_video(&db, n);
        }
        let api = FakeApi { score: 6, fail_analyze: false };

        enrich_video(&api, &db, "t1", "bucket/v3", 3).await;

        let t = db.get_ticket("t1", "u1").unwrap().unwrap();
        assert_eq!(t.priority, 6);
        let report: PriorityReport = serde_json::from_str(t.analysis.as_deref().unwrap()).unwrap();
        assert_eq!(report.priority.score, 6);

        let videos = db.list_media("t1", "video").unwrap();
        let v3 = videos.iter().find(|v| v.bucket_ref == "bucket/v3").unwrap();
        assert_eq!(v3.transcript.as_deref(), Some("summary en"));
        assert_eq!(v3.transcript_local.as_deref(), Some("summary local"));
    }

    #[tokio::test]
    async fn eleventh_video_is_description_only() {
        let db = ticket_db();
        db.set_ticket_analysis("t1", "{}", 9).unwrap();
        add_video(&db, 11);
        let api = FakeApi { score: 2, fail_analyze: false };

        enrich_video(&api, &db, "t1", "bucket/v11", 11).await;

        // priority untouched past the window
        let t = db.get_ticket("t1", "u1").unwrap().unwrap();
        assert_eq!(t.priority, 9);

        let videos = db.list_media("t1", "video").unwrap();
        let v11 = videos.iter().find(|v| v.bucket_ref == "bucket/v11").unwrap();
        assert_eq!(v11.transcript.as_deref(), Some("description of bucket/v11"));
        assert!(v11.transcript_local.is_none());
    }

    #[tokio::test]
    async fn lower_score_still_overwrites() {
        let db = ticket_db();
        db.set_ticket_analysis("t1", "{}", 9).unwrap();
        add_video(&db, 1);
        let api = FakeApi { score: 2, fail_analyze: false };

        enrich_video(&api, &db, "t1", "bucket/v1", 1).await;

        assert_eq!(db.get_ticket("t1", "u1").unwrap().unwrap().priority, 2);
    }

    #[tokio::test]
    async fn analysis_failure_degrades_to_placeholder() {
        let db = ticket_db();
        add_video(&db, 1);
        let api = FakeApi { score: 5, fail_analyze: true };

        enrich_video(&api, &db, "t1", "bucket/v1", 1).await;

        let t = db.get_ticket("t1", "u1").unwrap().unwrap();
        assert_eq!(t.priority, 0);
        assert!(t.analysis.is_none());

        let videos = db.list_media("t1", "video").unwrap();
        assert_eq!(videos[0].transcript.as_deref(), Some(NO_DESCRIPTION));
    }

    #[tokio::test]
    async fn audio_and_image_helpers_degrade() {
        let api = FakeApi { score: 0, fail_analyze: false };
        assert_eq!(transcript_or_placeholder(&api, "b").await, "spoken words");
        assert_eq!(description_or_placeholder(&api, "b").await, "description of b");
    }
}
