//! Verse source: the scripture API with a local fallback list

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use verse_core::{NewVerse, VerseError, VerseSource};

/// References the daily pick is drawn from
const REFERENCES: &[&str] = &[
    "John 3:16",
    "Psalm 23:1",
    "Proverbs 3:5-6",
    "Philippians 4:13",
    "Jeremiah 29:11",
    "Romans 8:28",
    "Isaiah 40:31",
    "Matthew 6:33",
    "Romans 12:2",
    "Philippians 4:6-7",
];

const GENERIC_EXPLANATION: &str = "This verse reminds us of God's wisdom and guidance throughout our lives. Scripture gives us insights into God's character and His plans for humanity.";
const GENERIC_APPLICATION: &str = "Consider meditating on this verse throughout your day. How might its truth apply to your current circumstances and decisions?";

/// Verses with commentary, used whole when the API is unreachable
pub fn fallback_verses() -> Vec<NewVerse> {
    vec![
        NewVerse::new(
            "For God so loved the world that he gave his one and only Son, that whoever believes in him shall not perish but have eternal life.",
            "John 3:16",
            "This verse encapsulates the core message of Christianity: God's profound love for humanity led Him to sacrifice His Son, Jesus Christ, so that through faith in Him, we can receive salvation and eternal life.",
            "Reflect on God's incredible love for you personally. How might you respond to this love today? Consider sharing this message of hope with someone who needs encouragement.",
        ),
        NewVerse::new(
            "For I know the plans I have for you, declares the LORD, plans to prosper you and not to harm you, plans to give you hope and a future.",
            "Jeremiah 29:11",
            "This verse was spoken to the Israelites during their exile in Babylon. God was assuring them that despite their current hardship, He had good plans for their future. It reminds us that even in difficult circumstances, God is working for our ultimate good and has a purpose for our lives.",
            "When facing uncertainty or challenges, remember that God has plans for your welfare, not for disaster. Take comfort in knowing that God sees beyond your current situation and is orchestrating events to give you hope and a future. Consider journaling about an area where you need to trust God's plans.",
        ),
        NewVerse::new(
            "I can do all things through Christ who strengthens me.",
            "Philippians 4:13",
            "Paul wrote these words while imprisoned, teaching that with Christ's strength, we can endure any circumstance, whether abundance or need. This verse isn't about superhuman abilities but about finding contentment and strength in every situation through our relationship with Jesus.",
            "Identify a current challenge in your life where you need divine strength. Pray specifically for Christ's power to work through your weakness, and take a small step forward in faith today, relying on His strength rather than your own.",
        ),
        NewVerse::new(
            "And we know that in all things God works for the good of those who love him, who have been called according to his purpose.",
            "Romans 8:28",
            "This verse doesn't promise that everything that happens is good, but rather that God can work through all circumstances, even painful ones, to accomplish good for those who love Him. It speaks to God's sovereignty and ultimate plan for our lives.",
            "Look back at a difficult situation in your past. Can you identify ways God brought good from it? In your current challenges, practice thanking God in advance for how He will work them for good, even when you can't yet see how.",
        ),
        NewVerse::new(
            "The LORD is my shepherd; I shall not want.",
            "Psalm 23:1",
            "This opening verse of the beloved psalm uses the metaphor of God as a shepherd caring for His sheep. It speaks to God's provision, protection, and guidance in our lives. When we follow the Good Shepherd, He provides everything we truly need.",
            "Take inventory of your needs versus your wants. Are you trusting God as your provider? Practice contentment today by focusing on gratitude for what you have rather than anxiety about what you lack.",
        ),
    ]
}

/// Fetches verse text from api.scripture.api.bible
pub struct BibleApiSource {
    client: reqwest::Client,
    base_url: String,
    bible_id: String,
    api_key: Option<String>,
    fallback: Vec<NewVerse>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    data: ApiVerse,
}

#[derive(Debug, Deserialize)]
struct ApiVerse {
    content: String,
}

impl BibleApiSource {
    pub fn new(
        base_url: impl Into<String>,
        bible_id: impl Into<String>,
        api_key: Option<String>,
    ) -> verse_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VerseError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bible_id: bible_id.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            fallback: fallback_verses(),
        })
    }

    async fn fetch(&self, reference: &str) -> verse_core::Result<NewVerse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| VerseError::UpstreamUnavailable("no API key configured".to_string()))?;

        let url = format!(
            "{}/bibles/{}/verses/{}",
            self.base_url, self.bible_id, reference
        );
        let response = self
            .client
            .get(&url)
            .header("api-key", api_key)
            .query(&[
                ("content-type", "text"),
                ("include-notes", "false"),
                ("include-titles", "false"),
                ("include-chapter-numbers", "false"),
                ("include-verse-numbers", "false"),
                ("include-verse-spans", "false"),
            ])
            .send()
            .await
            .map_err(|e| VerseError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerseError::UpstreamUnavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let body: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| VerseError::UpstreamUnavailable(format!("bad body: {}", e)))?;

        Ok(self.with_commentary(reference, body.data.content.trim()))
    }

    /// Pair fetched text with local commentary when we have it.
    fn with_commentary(&self, reference: &str, text: &str) -> NewVerse {
        match self.fallback.iter().find(|v| v.reference == reference) {
            Some(known) => NewVerse {
                text: text.to_string(),
                ..known.clone()
            },
            None => NewVerse::new(text, reference, GENERIC_EXPLANATION, GENERIC_APPLICATION),
        }
    }

    fn pick_fallback(&self) -> NewVerse {
        self.fallback
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| {
                NewVerse::new(
                    "The LORD is my shepherd; I shall not want.",
                    "Psalm 23:1",
                    GENERIC_EXPLANATION,
                    GENERIC_APPLICATION,
                )
            })
    }
}

#[async_trait]
impl VerseSource for BibleApiSource {
    async fn random_verse(&self) -> NewVerse {
        let reference = REFERENCES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Psalm 23:1");

        match self.fetch(reference).await {
            Ok(verse) => {
                debug!("Fetched {} from scripture API", verse.reference);
                verse
            }
            Err(e) => {
                warn!("Falling back to local verse list: {}", e);
                self.pick_fallback()
            }
        }
    }
}
