//! Range-aware wiremock responder for transfer tests.
//!
//! Serves a fixed body and records the `Range` header of every request so tests can
//! assert where a resumed transfer started.

use std::sync::{Arc, Mutex};

use wiremock::{Request, Respond, ResponseTemplate};

/// How the responder treats `Range` requests.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Answer with 206 and the requested suffix.
    Honor,
    /// Always answer 200 with the full body.
    Ignore,
    /// Answer 416 to any ranged request, 200 otherwise.
    Reject,
    /// Answer ranged requests with a `Content-Range` whose start is off by `skew`
    /// bytes; plain requests get 200.
    WrongStartOnResume { skew: u64 },
    /// Like `WrongStartOnResume`, but plain requests get a skewed 206 as well.
    WrongStartAlways { skew: u64 },
    /// Answer ranged requests with a 206 that starts where asked but declares the real
    /// (smaller) total; plain requests get 200.
    TotalBehindResume,
}

/// Serves `body` according to [`RangeMode`].
#[derive(Clone)]
pub struct RangeResponder {
    body: Arc<Vec<u8>>,
    mode: RangeMode,
    seen: Arc<Mutex<Vec<Option<String>>>>,
}

#[allow(dead_code)]
impl RangeResponder {
    pub fn new(body: Vec<u8>, mode: RangeMode) -> Self {
        Self {
            body: Arc::new(body),
            mode,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `Range` header of each request received so far (`None` when absent).
    pub fn ranges_seen(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().clone()
    }

    fn full(&self) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_bytes(self.body.as_slice().to_vec())
    }

    fn partial(&self, start: u64, reported_start: u64) -> ResponseTemplate {
        let total = self.body.len() as u64;
        let start_index = usize::try_from(start.min(total)).unwrap();
        let slice = self.body[start_index..].to_vec();
        let end = total.saturating_sub(1);
        ResponseTemplate::new(206)
            .insert_header(
                "Content-Range",
                format!("bytes {reported_start}-{end}/{total}").as_str(),
            )
            .set_body_bytes(slice)
    }
}

fn range_start(value: &str) -> Option<u64> {
    value
        .trim()
        .strip_prefix("bytes=")?
        .split('-')
        .next()?
        .trim()
        .parse()
        .ok()
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push(range.clone());
        let start = range.as_deref().and_then(range_start);

        match (self.mode, start) {
            (RangeMode::Honor, Some(start)) => {
                if start >= self.body.len() as u64 {
                    ResponseTemplate::new(416)
                } else {
                    self.partial(start, start)
                }
            }
            (RangeMode::Reject, Some(_)) => ResponseTemplate::new(416),
            (RangeMode::WrongStartOnResume { skew }, Some(start)) => {
                self.partial(start, start + skew)
            }
            (RangeMode::TotalBehindResume, Some(start)) => {
                let total = self.body.len();
                ResponseTemplate::new(206)
                    .insert_header(
                        "Content-Range",
                        format!("bytes {start}-{}/{total}", start + 9).as_str(),
                    )
                    .set_body_bytes(vec![0u8; 10])
            }
            (RangeMode::WrongStartAlways { skew }, start) => {
                let start = start.unwrap_or(0);
                self.partial(start, start + skew)
            }
            (
                RangeMode::Honor
                | RangeMode::Ignore
                | RangeMode::Reject
                | RangeMode::WrongStartOnResume { .. }
                | RangeMode::TotalBehindResume,
                _,
            ) => self.full(),
        }
    }
}

/// Deterministic, non-repeating test payload.
#[allow(dead_code)]
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from((i * 31 + i / 251) % 251).unwrap()).collect()
}
