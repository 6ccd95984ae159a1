//! Data models shared by the task builders, the normalizer and the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Wire-level method tags understood by `in.php`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Image uploaded as a multipart file
    Post,
    /// Image sent inline as base64
    Base64,
    Audio,
    UserRecaptcha,
    FunCaptcha,
    Geetest,
    GeetestV4,
    HCaptcha,
    KeyCaptcha,
    Capy,
    RotateCaptcha,
    Lemin,
    AtbCaptcha,
    Turnstile,
    AmazonWaf,
    MtCaptcha,
    FriendlyCaptcha,
    Tencent,
    CutCaptcha,
    VkImage,
    VkCaptcha,
    CaptchaFox,
    Prosopo,
    TemuImage,
    DataDome,
    CyberSiara,
    Yandex,
}

impl Method {
    /// Returns the string representation for API calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "post",
            Method::Base64 => "base64",
            Method::Audio => "audio",
            Method::UserRecaptcha => "userrecaptcha",
            Method::FunCaptcha => "funcaptcha",
            Method::Geetest => "geetest",
            Method::GeetestV4 => "geetest_v4",
            Method::HCaptcha => "hcaptcha",
            Method::KeyCaptcha => "keycaptcha",
            Method::Capy => "capy",
            Method::RotateCaptcha => "rotatecaptcha",
            Method::Lemin => "lemin",
            Method::AtbCaptcha => "atb_captcha",
            Method::Turnstile => "turnstile",
            Method::AmazonWaf => "amazon_waf",
            Method::MtCaptcha => "mt_captcha",
            Method::FriendlyCaptcha => "friendly_captcha",
            Method::Tencent => "tencent",
            Method::CutCaptcha => "cutcaptcha",
            Method::VkImage => "vkimage",
            Method::VkCaptcha => "vkcaptcha",
            Method::CaptchaFox => "captchafox",
            Method::Prosopo => "prosopo",
            Method::TemuImage => "temuimage",
            Method::DataDome => "datadome",
            Method::CyberSiara => "cybersiara",
            Method::Yandex => "yandex",
        }
    }

    /// reCAPTCHA tasks poll against the longer recaptcha timeout.
    pub fn is_recaptcha(&self) -> bool {
        matches!(self, Method::UserRecaptcha)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Proxy the solving worker should use, as `{type, uri}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// HTTP, HTTPS, SOCKS4 or SOCKS5
    #[serde(rename = "type")]
    pub kind: String,
    /// `login:password@IP_address:PORT`
    pub uri: String,
}

impl Proxy {
    pub fn new(kind: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            uri: uri.into(),
        }
    }
}

/// A single request field before it is rendered onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    /// Structured proxy; flattened into `proxy` + `proxytype` during normalization
    Proxy(Proxy),
}

impl FieldValue {
    /// Render the value the way it is sent in a form or query string.
    pub fn to_wire(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Proxy(p) => p.uri.clone(),
        }
    }

    /// Empty strings and zeroes count as "not set".
    pub fn is_falsy(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Int(i) => *i == 0,
            FieldValue::Float(f) => *f == 0.0,
            FieldValue::Proxy(p) => p.uri.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Int(v as i64)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<Proxy> for FieldValue {
    fn from(v: Proxy) -> Self {
        FieldValue::Proxy(v)
    }
}

/// Request fields keyed by name.
pub type Params = BTreeMap<String, FieldValue>;

/// Optional per-call fields for a captcha task.
///
/// Every field set here is sent to `in.php` (after renaming), including names
/// this crate does not know about. `timeout` and `polling_interval` only
/// affect the local polling loop.
///
/// # Example
/// ```ignore
/// let opts = Options::new()
///     .set("minLen", 4)
///     .set("numeric", 1)
///     .proxy(Proxy::new("HTTPS", "login:password@1.2.3.4:3128"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub(crate) fields: Params,
    pub(crate) timeout: Option<Duration>,
    pub(crate) polling_interval: Option<Duration>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary field, using either the caller-facing name
    /// (`minLen`, `hintText`, ...) or the raw wire name.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn proxy(self, proxy: Proxy) -> Self {
        self.set("proxy", proxy)
    }

    pub fn user_agent(self, user_agent: impl Into<String>) -> Self {
        self.set("userAgent", user_agent.into())
    }

    pub fn lang(self, lang: impl Into<String>) -> Self {
        self.set("lang", lang.into())
    }

    pub fn hint_text(self, text: impl Into<String>) -> Self {
        self.set("hintText", text.into())
    }

    /// Hint image as a local path or a base64 string.
    pub fn hint_image(self, image: impl Into<String>) -> Self {
        self.set("hintImg", image.into())
    }

    /// Override the configured software id; `0` suppresses the field.
    pub fn soft_id(self, soft_id: u32) -> Self {
        self.set("softId", soft_id)
    }

    /// Override the configured pingback URL; an empty string suppresses it.
    pub fn callback(self, url: impl Into<String>) -> Self {
        self.set("callback", url.into())
    }

    /// Polling timeout for this call only.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Polling interval for this call only.
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &Params {
        &self.fields
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Options::new(), |opts, (k, v)| opts.set(k, v))
    }
}

/// Image argument for tasks that accept one or several pictures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFiles {
    /// One path, base64 string or URL
    Single(String),
    /// Several local paths, in order
    List(Vec<String>),
    /// Several local paths under caller-chosen keys; only the order is kept
    Keyed(Vec<(String, String)>),
}

impl From<&str> for ImageFiles {
    fn from(v: &str) -> Self {
        ImageFiles::Single(v.to_string())
    }
}

impl From<String> for ImageFiles {
    fn from(v: String) -> Self {
        ImageFiles::Single(v)
    }
}

impl From<Vec<String>> for ImageFiles {
    fn from(v: Vec<String>) -> Self {
        ImageFiles::List(v)
    }
}

impl From<Vec<&str>> for ImageFiles {
    fn from(v: Vec<&str>) -> Self {
        ImageFiles::List(v.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for ImageFiles {
    fn from(v: &[&str]) -> Self {
        ImageFiles::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ImageFiles {
    fn from(v: [&str; N]) -> Self {
        ImageFiles::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<(String, String)>> for ImageFiles {
    fn from(v: Vec<(String, String)>) -> Self {
        ImageFiles::Keyed(v)
    }
}

impl From<BTreeMap<String, String>> for ImageFiles {
    fn from(v: BTreeMap<String, String>) -> Self {
        ImageFiles::Keyed(v.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for ImageFiles {
    fn from(v: HashMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = v.into_iter().collect();
        entries.sort();
        ImageFiles::Keyed(entries)
    }
}

/// Final outcome of [`crate::TwoCaptcha::solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(rename = "captchaId")]
    pub captcha_id: String,
    /// `None` when a pingback URL is in effect and the answer is pushed there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Additional fields of the extended JSON envelope
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskResult {
    pub(crate) fn pending(captcha_id: String) -> Self {
        Self {
            captcha_id,
            code: None,
            extra: Map::new(),
        }
    }

    /// Fill in the decoded answer.
    ///
    /// Envelopes lose their `status` key and have `request` renamed to `code`.
    /// Non-string `request` values are kept as compact JSON text.
    /// Envelopes without `request` never get here; the poll decoder rejects
    /// them, so `code` is `None` only for pingback results.
    pub(crate) fn with_answer(mut self, answer: Answer) -> Self {
        match answer {
            Answer::Text(code) => self.code = Some(code),
            Answer::Envelope(envelope) => {
                for (key, value) in envelope {
                    match key.as_str() {
                        "status" => {}
                        "request" => {
                            self.code = Some(match value {
                                Value::String(s) => s,
                                other => other.to_string(),
                            })
                        }
                        _ => {
                            self.extra.insert(key, value);
                        }
                    }
                }
            }
        }
        self
    }
}

/// Answer payload of a ready task.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// `OK|<code>` text response
    Text(String),
    /// Extended-mode JSON envelope with `status == 1`
    Envelope(Map<String, Value>),
}

/// Result of a single poll of `res.php`.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    NotReady,
    Ready(Answer),
}
