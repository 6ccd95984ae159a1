//! Parameter normalization.
//!
//! Turns caller-facing field names into the `in.php` vocabulary, injects the
//! client defaults and decides which values travel as multipart files.
//! Each step consumes a [`TaskRequest`] and returns the next one.

use crate::config::{SolverConfig, MAX_FILES};
use crate::error::{Result, SolverError};
use crate::models::{FieldValue, Params};
use crate::transport::{Submission, Transport};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Multipart attachments keyed by form field name.
pub type Files = BTreeMap<String, PathBuf>;

/// Caller name → wire name. Later entries win when two map to the same wire name.
pub const RENAMES: &[(&str, &str)] = &[
    ("caseSensitive", "regsense"),
    ("minLen", "min_len"),
    ("maxLen", "max_len"),
    ("minLength", "min_len"),
    ("maxLength", "max_len"),
    ("hintText", "textinstructions"),
    ("hintImg", "imginstructions"),
    ("url", "pageurl"),
    ("score", "min_score"),
    ("text", "textcaptcha"),
    ("rows", "recaptcharows"),
    ("cols", "recaptchacols"),
    ("previousId", "previousID"),
    ("canSkip", "can_no_answer"),
    ("apiServer", "api_server"),
    ("softId", "soft_id"),
    ("callback", "pingback"),
    ("datas", "data-s"),
];

/// Languages accepted by the audio method.
pub const AUDIO_LANGUAGES: [&str; 6] = ["en", "ru", "de", "el", "pt", "fr"];

/// Shape test for inline base64 payloads: no `.` and longer than 50 chars.
///
/// A long local file name without an extension also matches; callers with
/// such paths must rename them.
pub fn is_base64_like(value: &str) -> bool {
    !value.contains('.') && value.len() > 50
}

/// Where a captcha image (or audio clip) comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInput {
    LocalPath(PathBuf),
    Base64Body(String),
    RemoteUrl(String),
}

/// A [`FileInput`] ready to be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFile {
    /// Upload the file as multipart (`method=post`)
    Attach(PathBuf),
    /// Send inline (`method=base64`)
    Body(String),
}

impl FileInput {
    /// Classify an image argument.
    ///
    /// Base64 shape wins over everything else, then `http` prefixes, then
    /// the value is taken as a local path that must exist.
    pub fn classify(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(SolverError::validation("File required"));
        }

        if is_base64_like(value) {
            return Ok(FileInput::Base64Body(value.to_string()));
        }

        if value.starts_with("http") {
            return Ok(FileInput::RemoteUrl(value.to_string()));
        }

        let path = PathBuf::from(value);
        if !path.exists() {
            return Err(SolverError::validation(format!("File not found: {}", value)));
        }

        Ok(FileInput::LocalPath(path))
    }

    /// Classify an audio argument: base64, or an `.mp3` URL or local file.
    pub fn classify_audio(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(SolverError::validation("File is none"));
        }

        if is_base64_like(value) {
            return Ok(FileInput::Base64Body(value.to_string()));
        }

        if !value.ends_with(".mp3") {
            return Err(SolverError::validation(
                "File extension is not .mp3 or it is not a base64 string.",
            ));
        }

        if value.starts_with("http") {
            return Ok(FileInput::RemoteUrl(value.to_string()));
        }

        let path = PathBuf::from(value);
        if !path.exists() {
            return Err(SolverError::validation(format!("File not found: {}", value)));
        }

        Ok(FileInput::LocalPath(path))
    }

    /// Download remote input and, when `inline`, read local files into base64.
    pub(crate) async fn resolve<T>(self, transport: &T, inline: bool) -> Result<ResolvedFile>
    where
        T: Transport + ?Sized,
    {
        match self {
            FileInput::Base64Body(body) => Ok(ResolvedFile::Body(body)),
            FileInput::LocalPath(path) if !inline => Ok(ResolvedFile::Attach(path)),
            FileInput::LocalPath(path) => {
                let data = tokio::fs::read(&path).await?;
                Ok(ResolvedFile::Body(STANDARD.encode(data)))
            }
            FileInput::RemoteUrl(url) => {
                tracing::debug!(url = %url, "Downloading remote captcha input");
                let data = transport.fetch(&url).await.map_err(|e| {
                    tracing::warn!(url = %url, error = %e, "Download failed");
                    SolverError::validation(format!(
                        "File could not be downloaded from url: {}",
                        url
                    ))
                })?;
                Ok(ResolvedFile::Body(STANDARD.encode(data)))
            }
        }
    }
}

/// Check a list of local images and key them `file_1`, `file_2`, ... in order.
pub fn extract_multi_files<S: AsRef<str>>(paths: &[S]) -> Result<Files> {
    if paths.is_empty() {
        return Err(SolverError::validation("File required"));
    }

    if paths.len() > MAX_FILES {
        return Err(SolverError::validation(format!(
            "Too many files (max: {})",
            MAX_FILES
        )));
    }

    let missing: Vec<&str> = paths
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !Path::new(p).exists())
        .collect();
    if !missing.is_empty() {
        return Err(SolverError::validation(format!(
            "File not found: {:?}",
            missing
        )));
    }

    Ok(paths
        .iter()
        .enumerate()
        .map(|(i, p)| (format!("file_{}", i + 1), PathBuf::from(p.as_ref())))
        .collect())
}

/// Apply [`RENAMES`] and flatten a structured `proxy`.
///
/// Keys outside the table pass through unchanged and take precedence over a
/// renamed key with the same wire name.
pub fn rename(mut fields: Params) -> Params {
    let mut renamed = Params::new();

    for (from, to) in RENAMES {
        if let Some(value) = fields.remove(*from) {
            renamed.insert((*to).to_string(), value);
        }
    }

    if let Some(proxy) = fields.remove("proxy") {
        match proxy {
            FieldValue::Proxy(p) => {
                renamed.insert("proxy".into(), FieldValue::Text(p.uri));
                renamed.insert("proxytype".into(), FieldValue::Text(p.kind));
            }
            flat => {
                renamed.insert("proxy".into(), flat);
            }
        }
    }

    renamed.extend(fields);
    renamed
}

/// Set `key`, and `softId` / `callback` from the config unless overridden.
///
/// Falsy overrides remove the field. Already-normalized `soft_id` and
/// `pingback` are left alone. A suppressed default leaves no trace in the
/// fields, so call this once per request; [`TaskRequest::normalize`] enforces that.
pub fn inject_defaults(mut fields: Params, config: &SolverConfig) -> Params {
    fields.insert("key".into(), FieldValue::Text(config.api_key.clone()));

    if fields.get("pingback").is_some_and(FieldValue::is_falsy) {
        fields.remove("pingback");
    } else if !fields.contains_key("pingback") {
        let callback = fields
            .remove("callback")
            .or_else(|| config.callback.clone().map(FieldValue::Text));
        if let Some(callback) = callback.filter(|v| !v.is_falsy()) {
            fields.insert("callback".into(), callback);
        }
    }

    if fields.get("soft_id").is_some_and(FieldValue::is_falsy) {
        fields.remove("soft_id");
    } else if !fields.contains_key("soft_id") {
        let soft_id = fields
            .remove("softId")
            .unwrap_or(FieldValue::Int(config.soft_id as i64));
        if !soft_id.is_falsy() {
            fields.insert("softId".into(), soft_id);
        }
    }

    fields
}

/// Move a hint image given as a local path into the multipart files.
///
/// Base64 hints stay inline. When no files exist yet, a `file` field joins
/// the hint as an attachment; a base64 main image leaves the hint alone.
pub fn bundle_hint_image(mut fields: Params, mut files: Files) -> Result<(Params, Files)> {
    let Some(hint) = fields.remove("imginstructions") else {
        return Ok((fields, files));
    };

    if hint.is_falsy() {
        return Ok((fields, files));
    }

    let hint_value = hint.to_wire();
    if is_base64_like(&hint_value) {
        fields.insert("imginstructions".into(), hint);
        return Ok((fields, files));
    }

    let hint_path = PathBuf::from(&hint_value);
    if !hint_path.exists() {
        return Err(SolverError::validation(format!(
            "File not found: {}",
            hint_value
        )));
    }

    if files.is_empty() {
        if let Some(file) = fields.remove("file") {
            files.insert("file".into(), PathBuf::from(file.to_wire()));
        }
    }
    files.insert("imginstructions".into(), hint_path);

    Ok((fields, files))
}

/// Fields and files of one submission, between normalization steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRequest {
    pub fields: Params,
    pub files: Files,
    /// Set once the full pipeline ran; suppressed defaults must not come back
    normalized: bool,
}

impl TaskRequest {
    pub fn new(fields: Params, files: Files) -> Self {
        Self {
            fields,
            files,
            normalized: false,
        }
    }

    /// defaults → rename → hint image. A no-op on an already normalized request.
    pub fn normalize(self, config: &SolverConfig) -> Result<Self> {
        if self.normalized {
            return Ok(self);
        }

        let mut request = self.with_defaults(config).renamed().with_hint_image_bundled()?;
        request.normalized = true;
        Ok(request)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub fn with_defaults(self, config: &SolverConfig) -> Self {
        Self {
            fields: inject_defaults(self.fields, config),
            ..self
        }
    }

    pub fn renamed(self) -> Self {
        Self {
            fields: rename(self.fields),
            ..self
        }
    }

    pub fn with_hint_image_bundled(self) -> Result<Self> {
        let (fields, files) = bundle_hint_image(self.fields, self.files)?;
        Ok(Self {
            fields,
            files,
            normalized: self.normalized,
        })
    }

    /// Whether the answer will be pushed to a pingback URL.
    pub fn has_callback(&self) -> bool {
        self.fields
            .get("pingback")
            .is_some_and(|v| !v.is_falsy())
    }

    pub fn method(&self) -> Option<&str> {
        self.fields.get("method").and_then(FieldValue::as_text)
    }

    pub fn into_submission(self) -> Submission {
        Submission {
            fields: self
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.to_wire()))
                .collect(),
            files: self.files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Proxy;
    use crate::transport::testing::MockTransport;
    use std::io::Write;
    use tempfile::NamedTempFile;


    const B64: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn image() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"\xff\xd8\xff\xe0fake-jpeg").unwrap();
        file
    }

    fn params(pairs: &[(&str, FieldValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_rename_every_table_entry() {
        for (from, to) in RENAMES {
            let input = params(&[(*from, FieldValue::from("v")), ("custom", FieldValue::from(7))]);
            let output = rename(input);
            assert!(output.contains_key(*to), "{} should become {}", from, to);
            assert!(!output.contains_key(*from));
            assert_eq!(output.get("custom"), Some(&FieldValue::Int(7)));
        }
    }

    #[test]
    fn test_rename_keeps_wire_sensitive_spelling() {
        let output = rename(params(&[
            ("previousId", FieldValue::from("55")),
            ("canSkip", FieldValue::from(1)),
            ("score", FieldValue::from(0.7)),
        ]));
        assert_eq!(output.get("previousID"), Some(&FieldValue::from("55")));
        assert_eq!(output.get("can_no_answer"), Some(&FieldValue::Int(1)));
        assert_eq!(output.get("min_score"), Some(&FieldValue::Float(0.7)));
    }

    #[test]
    fn test_rename_flattens_proxy() {
        let output = rename(params(&[(
            "proxy",
            FieldValue::from(Proxy::new("HTTPS", "u:p@h:p")),
        )]));
        assert_eq!(output.get("proxy"), Some(&FieldValue::from("u:p@h:p")));
        assert_eq!(output.get("proxytype"), Some(&FieldValue::from("HTTPS")));
        assert!(!output.values().any(|v| matches!(v, FieldValue::Proxy(_))));
    }

    #[test]
    fn test_unknown_key_beats_renamed_key() {
        let output = rename(params(&[
            ("url", FieldValue::from("renamed")),
            ("pageurl", FieldValue::from("explicit")),
        ]));
        assert_eq!(output.get("pageurl"), Some(&FieldValue::from("explicit")));
    }

    #[test]
    fn test_defaults_injected() {
        let config = SolverConfig::new("API_KEY");
        let request = TaskRequest::new(Params::new(), Files::new())
            .normalize(&config)
            .unwrap();
        assert_eq!(request.fields.get("key"), Some(&FieldValue::from("API_KEY")));
        assert_eq!(request.fields.get("soft_id"), Some(&FieldValue::Int(4580)));
        assert!(!request.has_callback());
    }

    #[test]
    fn test_falsy_soft_id_override_suppresses_field() {
        let config = SolverConfig::new("API_KEY");
        let fields = params(&[("softId", FieldValue::from(0))]);
        let request = TaskRequest::new(fields, Files::new())
            .normalize(&config)
            .unwrap();
        assert!(!request.fields.contains_key("soft_id"));
        assert!(!request.fields.contains_key("softId"));
    }

    #[test]
    fn test_callback_from_config_and_override() {
        let mut config = SolverConfig::new("API_KEY");
        config.callback = Some("https://hook.example/cb".into());

        let request = TaskRequest::default().normalize(&config).unwrap();
        assert_eq!(
            request.fields.get("pingback"),
            Some(&FieldValue::from("https://hook.example/cb"))
        );
        assert!(request.has_callback());

        let fields = params(&[("callback", FieldValue::from(""))]);
        let request = TaskRequest::new(fields, Files::new())
            .normalize(&config)
            .unwrap();
        assert!(!request.has_callback());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let config = SolverConfig::new("API_KEY");
        let fields = params(&[
            ("softId", FieldValue::from(1234)),
            ("minLen", FieldValue::from(4)),
            ("proxy", FieldValue::from(Proxy::new("HTTP", "h:1"))),
        ]);
        let once = TaskRequest::new(fields, Files::new())
            .normalize(&config)
            .unwrap();
        let twice = once.clone().normalize(&config).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.fields.get("soft_id"), Some(&FieldValue::Int(1234)));
        assert_eq!(
            twice.fields.keys().filter(|k| k.as_str() == "key").count(),
            1
        );
    }

    #[test]
    fn test_normalize_twice_keeps_suppressed_defaults() {
        let mut config = SolverConfig::new("API_KEY");
        config.callback = Some("https://hook.example/cb".into());
        let fields = params(&[
            ("softId", FieldValue::from(0)),
            ("callback", FieldValue::from("")),
        ]);

        let once = TaskRequest::new(fields, Files::new())
            .normalize(&config)
            .unwrap();
        assert!(once.is_normalized());
        assert!(!once.fields.contains_key("soft_id"));
        assert!(!once.fields.contains_key("pingback"));

        let twice = once.clone().normalize(&config).unwrap();
        assert_eq!(once, twice);
        assert!(!twice.fields.contains_key("soft_id"));
        assert!(!twice.has_callback());
    }

    #[test]
    fn test_classify_base64() {
        assert_eq!(
            FileInput::classify(B64).unwrap(),
            FileInput::Base64Body(B64.to_string())
        );
        // 50 characters is not enough
        let short = "A".repeat(50);
        assert!(FileInput::classify(&short).is_err());
    }

    #[test]
    fn test_classify_url_and_path() {
        assert_eq!(
            FileInput::classify("https://example.com/captcha.jpg").unwrap(),
            FileInput::RemoteUrl("https://example.com/captcha.jpg".into())
        );

        let file = image();
        let path = file.path().to_str().unwrap();
        assert_eq!(
            FileInput::classify(path).unwrap(),
            FileInput::LocalPath(file.path().to_path_buf())
        );

        let err = FileInput::classify("lost_file.jpg").unwrap_err();
        assert!(matches!(err, SolverError::Validation(_)));
        assert!(matches!(
            FileInput::classify("").unwrap_err(),
            SolverError::Validation(_)
        ));
    }

    #[test]
    fn test_classify_audio() {
        assert!(matches!(
            FileInput::classify_audio("https://example.com/a.mp3").unwrap(),
            FileInput::RemoteUrl(_)
        ));
        assert!(matches!(
            FileInput::classify_audio("clip.wav").unwrap_err(),
            SolverError::Validation(_)
        ));
        assert!(matches!(
            FileInput::classify_audio(B64).unwrap(),
            FileInput::Base64Body(_)
        ));
    }

    #[tokio::test]
    async fn test_resolve_remote_url_reencodes_base64() {
        let transport = MockTransport::new().with_download("https://x/img.jpg", b"hello");
        let resolved = FileInput::RemoteUrl("https://x/img.jpg".into())
            .resolve(&transport, false)
            .await
            .unwrap();
        assert_eq!(resolved, ResolvedFile::Body("aGVsbG8=".into()));

        let err = FileInput::RemoteUrl("https://x/missing.jpg".into())
            .resolve(&transport, false)
            .await
            .unwrap_err();
        assert!(matches!(err, SolverError::Validation(_)));
    }

    #[tokio::test]
    async fn test_resolve_local_path_inline_reads_file() {
        let file = image();
        let transport = MockTransport::new();
        let input = FileInput::LocalPath(file.path().to_path_buf());

        let attached = input.clone().resolve(&transport, false).await.unwrap();
        assert_eq!(attached, ResolvedFile::Attach(file.path().to_path_buf()));

        let inline = input.resolve(&transport, true).await.unwrap();
        assert!(matches!(inline, ResolvedFile::Body(ref b) if !b.is_empty()));
    }

    #[test]
    fn test_extract_multi_files_orders_keys() {
        let a = image();
        let b = image();
        let paths = [a.path().to_str().unwrap(), b.path().to_str().unwrap()];
        let files = extract_multi_files(&paths[..]).unwrap();
        assert_eq!(files.get("file_1"), Some(&a.path().to_path_buf()));
        assert_eq!(files.get("file_2"), Some(&b.path().to_path_buf()));
    }

    #[test]
    fn test_extract_multi_files_limits() {
        let img = image();
        let path = img.path().to_str().unwrap();
        let ten = vec![path; MAX_FILES + 1];
        let err = extract_multi_files(&ten[..]).unwrap_err();
        assert!(err.to_string().contains("Too many files"));

        let err = extract_multi_files(&[path, "lost_file.jpg"][..]).unwrap_err();
        assert!(err.to_string().contains("lost_file.jpg"));
    }

    #[test]
    fn test_hint_image_joins_main_file() {
        let main = image();
        let hint = image();
        let fields = params(&[
            ("file", FieldValue::from(main.path().to_str().unwrap())),
            ("imginstructions", FieldValue::from(hint.path().to_str().unwrap())),
        ]);
        let (fields, files) = bundle_hint_image(fields, Files::new()).unwrap();
        assert!(!fields.contains_key("file"));
        assert!(!fields.contains_key("imginstructions"));
        assert_eq!(files.get("file"), Some(&main.path().to_path_buf()));
        assert_eq!(files.get("imginstructions"), Some(&hint.path().to_path_buf()));
    }

    #[test]
    fn test_hint_image_alone_when_main_is_base64() {
        let hint = image();
        let fields = params(&[
            ("body", FieldValue::from(B64)),
            ("imginstructions", FieldValue::from(hint.path().to_str().unwrap())),
        ]);
        let (fields, files) = bundle_hint_image(fields, Files::new()).unwrap();
        assert_eq!(fields.get("body"), Some(&FieldValue::from(B64)));
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("imginstructions"));
    }

    #[test]
    fn test_base64_hint_stays_inline() {
        let fields = params(&[("imginstructions", FieldValue::from(B64))]);
        let (fields, files) = bundle_hint_image(fields, Files::new()).unwrap();
        assert_eq!(fields.get("imginstructions"), Some(&FieldValue::from(B64)));
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_hint_file_fails() {
        let fields = params(&[("imginstructions", FieldValue::from("lost_hint.jpg"))]);
        assert!(matches!(
            bundle_hint_image(fields, Files::new()).unwrap_err(),
            SolverError::Validation(_)
        ));
    }
}
