//! Async SEC EDGAR client.
//!
//! SEC allows at most 10 requests per second and requires a User-Agent with
//! a contact address. All requests go through a sliding-window rate limiter;
//! callers block until a slot frees up rather than getting an error.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://data.sec.gov";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("SEC User-Agent is required (set SEC_USER_AGENT with a contact address)")]
    MissingUserAgent,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("SEC rate limit exceeded after retries")]
    RateLimited,

    #[error("SEC API error: {0}")]
    Http(String),

    #[error("Failed to parse SEC response: {0}")]
    Parse(String),
}

/// Sliding-window rate limiter: at most `max_requests` per `window`.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = ts.front().copied().map(|front| front + self.window);
            drop(ts);
            if let Some(wait_until) = wait_until {
                let sleep_dur =
                    wait_until.saturating_duration_since(Instant::now()) + Duration::from_millis(10);
                tracing::debug!("Rate limiter: waiting {:.3}s for SEC slot", sleep_dur.as_secs_f64());
                tokio::time::sleep(sleep_dur).await;
            }
        }
    }
}

/// One filing entry from a company's submissions index.
#[derive(Debug, Clone)]
pub struct Filing {
    pub accession_number: String,
    pub filing_date: String,
    pub report_date: String,
    pub form: String,
    pub primary_document: String,
    pub cik: String,
}

/// Company profile from the submissions endpoint.
#[derive(Debug, Clone)]
pub struct CompanyInfo {
    pub cik: String,
    pub name: String,
    pub sic: Option<String>,
    pub sic_description: Option<String>,
    pub tickers: Vec<String>,
    pub exchanges: Vec<String>,
}

/// Ticker search hit from the company_tickers index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyMatch {
    pub cik: String,
    pub name: String,
    pub ticker: String,
}

#[derive(Deserialize)]
struct SubmissionsResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sic: Option<String>,
    #[serde(default, rename = "sicDescription")]
    sic_description: Option<String>,
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    exchanges: Vec<String>,
    #[serde(default)]
    filings: Option<FilingsSection>,
}

#[derive(Deserialize, Default)]
struct FilingsSection {
    #[serde(default)]
    recent: RecentFilings,
}

#[derive(Deserialize, Default)]
struct RecentFilings {
    #[serde(default)]
    form: Vec<String>,
    #[serde(default, rename = "accessionNumber")]
    accession_number: Vec<String>,
    #[serde(default, rename = "filingDate")]
    filing_date: Vec<String>,
    #[serde(default, rename = "reportDate")]
    report_date: Vec<String>,
    #[serde(default, rename = "primaryDocument")]
    primary_document: Vec<String>,
}

#[derive(Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
    title: String,
}

#[derive(Clone)]
pub struct EdgarClient {
    user_agent: String,
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl EdgarClient {
    /// SEC requires a valid contact email in the User-Agent.
    pub fn new(user_agent: impl Into<String>) -> Result<Self, EdgarError> {
        let user_agent = user_agent.into();
        if user_agent.trim().is_empty() {
            return Err(EdgarError::MissingUserAgent);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EdgarError::Http(e.to_string()))?;

        Ok(Self {
            user_agent,
            client,
            rate_limiter: RateLimiter::new(10, Duration::from_secs(1)),
        })
    }

    /// Normalize CIK to a 10-digit zero-padded string.
    pub fn normalize_cik(cik: &str) -> String {
        format!("{:0>10}", cik.trim_start_matches('0'))
    }

    /// Rate-limited GET with retry. Transport failures back off
    /// exponentially; a 429 waits out the advertised window.
    async fn get(&self, url: &str) -> Result<reqwest::Response, EdgarError> {
        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;

            let response = self
                .client
                .get(url)
                .header("User-Agent", &self.user_agent)
                .header("Accept", "application/json")
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.as_u16() == 429 {
                        let wait_secs = 15u64;
                        tracing::warn!(
                            "SEC 429 rate limited, waiting {}s before retry {}/{}",
                            wait_secs,
                            attempt + 1,
                            MAX_ATTEMPTS
                        );
                        tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        continue;
                    }
                    if status.as_u16() == 404 {
                        return Err(EdgarError::NotFound(url.to_string()));
                    }
                    if !status.is_success() {
                        return Err(EdgarError::Http(format!("{} for {}", status, url)));
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt + 1 == MAX_ATTEMPTS {
                        return Err(EdgarError::Http(e.to_string()));
                    }
                    let backoff = Duration::from_secs(1 << attempt);
                    tracing::warn!(
                        "SEC request failed ({}), retrying in {:?} ({}/{})",
                        e,
                        backoff,
                        attempt + 1,
                        MAX_ATTEMPTS
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(EdgarError::RateLimited)
    }

    async fn get_submissions(&self, cik: &str) -> Result<SubmissionsResponse, EdgarError> {
        let normalized = Self::normalize_cik(cik);
        let url = format!("{}/submissions/CIK{}.json", BASE_URL, normalized);
        let response = self.get(&url).await?;
        response
            .json::<SubmissionsResponse>()
            .await
            .map_err(|e| EdgarError::Parse(e.to_string()))
    }

    /// Recent filings for a company, filtered by form type.
    pub async fn get_company_filings(
        &self,
        cik: &str,
        filing_type: &str,
        count: usize,
    ) -> Result<Vec<Filing>, EdgarError> {
        let normalized = Self::normalize_cik(cik);
        tracing::info!("Fetching filings for CIK {}, type={}", normalized, filing_type);

        let submissions = self.get_submissions(cik).await?;
        let Some(filings) = submissions.filings else {
            return Ok(Vec::new());
        };
        let recent = filings.recent;

        let mut results = Vec::new();
        for (i, form) in recent.form.iter().enumerate() {
            if !filing_type.is_empty() && form != filing_type {
                continue;
            }

            let field = |values: &[String]| values.get(i).cloned().unwrap_or_default();
            results.push(Filing {
                accession_number: field(&recent.accession_number),
                filing_date: field(&recent.filing_date),
                report_date: field(&recent.report_date),
                form: form.clone(),
                primary_document: field(&recent.primary_document),
                cik: normalized.clone(),
            });

            if results.len() >= count {
                break;
            }
        }

        tracing::info!(
            "Found {} {} filings for CIK {}",
            results.len(),
            filing_type,
            normalized
        );
        Ok(results)
    }

    /// Company profile details.
    pub async fn get_company_info(&self, cik: &str) -> Result<CompanyInfo, EdgarError> {
        let normalized = Self::normalize_cik(cik);
        let submissions = self.get_submissions(cik).await?;

        Ok(CompanyInfo {
            cik: normalized,
            name: submissions.name,
            sic: submissions.sic,
            sic_description: submissions.sic_description,
            tickers: submissions.tickers,
            exchanges: submissions.exchanges,
        })
    }

    /// Search companies by ticker or name via the company_tickers index.
    /// Exact ticker matches sort first.
    pub async fn search_companies(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CompanyMatch>, EdgarError> {
        let url = format!("{}/files/company_tickers.json", BASE_URL);
        let response = self.get(&url).await?;
        let entries: std::collections::HashMap<String, TickerEntry> = response
            .json()
            .await
            .map_err(|e| EdgarError::Parse(e.to_string()))?;

        let query_lower = query.to_lowercase();
        let query_trimmed = query_lower.trim();

        let mut results: Vec<CompanyMatch> = entries
            .values()
            .filter(|entry| {
                entry.ticker.to_lowercase() == query_trimmed
                    || entry.title.to_lowercase().contains(query_trimmed)
                    || entry.cik_str.to_string() == query_trimmed
            })
            .map(|entry| CompanyMatch {
                cik: Self::normalize_cik(&entry.cik_str.to_string()),
                name: entry.title.clone(),
                ticker: entry.ticker.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            let a_exact = a.ticker.to_lowercase() != query_trimmed;
            let b_exact = b.ticker.to_lowercase() != query_trimmed;
            a_exact
                .cmp(&b_exact)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        results.truncate(limit);

        Ok(results)
    }
}
