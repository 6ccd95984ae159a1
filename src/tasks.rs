//! One constructor per captcha family.
//!
//! Each constructor pins the family's wire fields and keeps the caller's
//! [`Options`] alongside; [`crate::TwoCaptcha::solve`] turns the task into a
//! submission. Constructors that take images validate them up front.
//!
//! ```ignore
//! use twocaptcha::{CaptchaTask, Options};
//!
//! let task = CaptchaTask::recaptcha(
//!     "6Le-wvkSVVABCPBMRTvw0Q4Muexq1bi0DJwx_mJ-",
//!     "https://mysite.com/page/with/recaptcha",
//!     Options::new().set("version", "v3").set("score", 0.7),
//! );
//! let result = solver.solve(task).await?;
//! ```

use crate::config::SolverConfig;
use crate::error::{Result, SolverError};
use crate::models::{FieldValue, ImageFiles, Method, Options, Params, Proxy};
use crate::normalize::{
    extract_multi_files, FileInput, Files, ResolvedFile, TaskRequest, AUDIO_LANGUAGES,
};
use crate::transport::Transport;
use std::time::Duration;

/// Primary image (or audio) of a task.
#[derive(Debug, Clone, PartialEq)]
struct PrimaryFile {
    input: FileInput,
    /// Always send as base64 `body`, even for local files
    inline: bool,
}

/// A captcha job, ready to be handed to the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaTask {
    method: Method,
    fields: Params,
    options: Options,
    primary: Option<PrimaryFile>,
    files: Files,
}

impl CaptchaTask {
    fn new(method: Method, options: Options) -> Self {
        Self {
            method,
            fields: Params::new(),
            options,
            primary: None,
            files: Files::new(),
        }
    }

    fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    fn primary(mut self, input: FileInput, inline: bool) -> Self {
        self.primary = Some(PrimaryFile { input, inline });
        self
    }

    /// Attach one image (any form) or several local images.
    fn images(mut self, images: ImageFiles) -> Result<Self> {
        match images {
            ImageFiles::Single(value) => Ok(self.primary(FileInput::classify(&value)?, false)),
            ImageFiles::List(paths) => {
                self.files = extract_multi_files(&paths)?;
                Ok(self)
            }
            ImageFiles::Keyed(entries) => {
                let paths: Vec<String> = entries.into_iter().map(|(_, path)| path).collect();
                self.files = extract_multi_files(&paths)?;
                Ok(self)
            }
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Per-call timeout, else the recaptcha or default timeout.
    /// A zero override counts as unset.
    pub fn timeout_for(&self, config: &SolverConfig) -> Duration {
        self.options
            .timeout
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(if self.method.is_recaptcha() {
                config.recaptcha_timeout
            } else {
                config.default_timeout
            })
    }

    /// Per-call interval, else the configured one. A zero override counts as unset.
    pub fn polling_interval_for(&self, config: &SolverConfig) -> Duration {
        self.options
            .polling_interval
            .filter(|interval| !interval.is_zero())
            .unwrap_or(config.polling_interval)
    }

    /// Resolve the primary file and merge fixed fields, options and method.
    ///
    /// Caller options override the family's fixed fields; the method and
    /// the image field are always the ones this task decided on.
    pub(crate) async fn into_request<T>(self, transport: &T) -> Result<TaskRequest>
    where
        T: Transport + ?Sized,
    {
        let mut method = self.method;
        let mut fields = self.fields;
        fields.extend(self.options.fields);

        if let Some(primary) = self.primary {
            match primary.input.resolve(transport, primary.inline).await? {
                ResolvedFile::Attach(path) => {
                    fields.insert(
                        "file".into(),
                        FieldValue::Text(path.to_string_lossy().into_owned()),
                    );
                }
                ResolvedFile::Body(body) => {
                    if method == Method::Post {
                        method = Method::Base64;
                    }
                    fields.insert("body".into(), FieldValue::Text(body));
                }
            }
        }

        fields.insert("method".into(), FieldValue::from(method.as_str()));
        Ok(TaskRequest::new(fields, self.files))
    }

    /// Normal captcha: distorted text in an image (path, URL or base64).
    pub fn normal(file: &str, options: Options) -> Result<Self> {
        Ok(Self::new(Method::Post, options).primary(FileInput::classify(file)?, false))
    }

    /// Audio captcha: an `.mp3` path or URL, or base64 mp3 data.
    pub fn audio(file: &str, lang: &str, options: Options) -> Result<Self> {
        let input = FileInput::classify_audio(file)?;

        if !AUDIO_LANGUAGES.contains(&lang) {
            return Err(SolverError::validation(format!(
                "Lang not in {:?}. You send {}",
                AUDIO_LANGUAGES, lang
            )));
        }

        Ok(Self::new(Method::Audio, options)
            .field("lang", lang)
            .primary(input, true))
    }

    /// Question in plain text.
    pub fn text(text: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Post, options).field("text", text.into())
    }

    /// reCAPTCHA V2 or V3. Defaults to `version=v2`, `enterprise=0`;
    /// polls with the recaptcha timeout.
    pub fn recaptcha(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::UserRecaptcha, options)
            .field("googlekey", sitekey.into())
            .field("url", url.into())
            .field("version", "v2")
            .field("enterprise", 0)
    }

    /// FunCaptcha (Arkose Labs).
    pub fn funcaptcha(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::FunCaptcha, options)
            .field("publickey", sitekey.into())
            .field("url", url.into())
    }

    pub fn geetest(
        gt: impl Into<String>,
        challenge: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::Geetest, options)
            .field("gt", gt.into())
            .field("challenge", challenge.into())
            .field("url", url.into())
    }

    pub fn geetest_v4(captcha_id: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::GeetestV4, options)
            .field("captcha_id", captcha_id.into())
            .field("url", url.into())
    }

    pub fn hcaptcha(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::HCaptcha, options)
            .field("sitekey", sitekey.into())
            .field("url", url.into())
    }

    pub fn keycaptcha(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        web_server_sign: impl Into<String>,
        web_server_sign2: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::KeyCaptcha, options)
            .field("s_s_c_user_id", user_id.into())
            .field("s_s_c_session_id", session_id.into())
            .field("s_s_c_web_server_sign", web_server_sign.into())
            .field("s_s_c_web_server_sign2", web_server_sign2.into())
            .field("url", url.into())
    }

    pub fn capy(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Capy, options)
            .field("captchakey", sitekey.into())
            .field("url", url.into())
    }

    /// Grid: click the matching tiles of an image.
    pub fn grid(file: &str, options: Options) -> Result<Self> {
        Ok(Self::new(Method::Post, options)
            .field("recaptcha", 1)
            .primary(FileInput::classify(file)?, false))
    }

    /// Canvas: draw around an object. Needs `hintText` and/or `hintImg`.
    pub fn canvas(file: &str, options: Options) -> Result<Self> {
        let has_hint = ["hintText", "hintImg", "textinstructions", "imginstructions"]
            .iter()
            .any(|key| options.contains(key));
        if !has_hint {
            return Err(SolverError::validation(
                "parameters required: hintText and/or hintImg",
            ));
        }

        Ok(Self::new(Method::Post, options)
            .field("recaptcha", 1)
            .field("canvas", 1)
            .primary(FileInput::classify(file)?, false))
    }

    /// ClickCaptcha: returns point coordinates on the image.
    pub fn coordinates(file: &str, options: Options) -> Result<Self> {
        Ok(Self::new(Method::Post, options)
            .field("coordinatescaptcha", 1)
            .primary(FileInput::classify(file)?, false))
    }

    /// Rotate an object upright; one image or up to nine.
    pub fn rotate(files: impl Into<ImageFiles>, options: Options) -> Result<Self> {
        Self::new(Method::RotateCaptcha, options).images(files.into())
    }

    pub fn lemin(
        captcha_id: impl Into<String>,
        div_id: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::Lemin, options)
            .field("captcha_id", captcha_id.into())
            .field("div_id", div_id.into())
            .field("url", url.into())
    }

    pub fn atb_captcha(
        app_id: impl Into<String>,
        api_server: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::AtbCaptcha, options)
            .field("app_id", app_id.into())
            .field("api_server", api_server.into())
            .field("url", url.into())
    }

    /// Cloudflare Turnstile.
    pub fn turnstile(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Turnstile, options)
            .field("sitekey", sitekey.into())
            .field("url", url.into())
    }

    pub fn amazon_waf(
        sitekey: impl Into<String>,
        iv: impl Into<String>,
        context: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::AmazonWaf, options)
            .field("sitekey", sitekey.into())
            .field("iv", iv.into())
            .field("context", context.into())
            .field("url", url.into())
    }

    pub fn mtcaptcha(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::MtCaptcha, options)
            .field("sitekey", sitekey.into())
            .field("url", url.into())
    }

    pub fn friendly_captcha(
        sitekey: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::FriendlyCaptcha, options)
            .field("sitekey", sitekey.into())
            .field("url", url.into())
    }

    pub fn tencent(app_id: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Tencent, options)
            .field("app_id", app_id.into())
            .field("url", url.into())
    }

    pub fn cutcaptcha(
        misery_key: impl Into<String>,
        api_key: impl Into<String>,
        url: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::CutCaptcha, options)
            .field("misery_key", misery_key.into())
            .field("api_key", api_key.into())
            .field("url", url.into())
    }

    pub fn datadome(
        captcha_url: impl Into<String>,
        pageurl: impl Into<String>,
        user_agent: impl Into<String>,
        proxy: Proxy,
        options: Options,
    ) -> Self {
        Self::new(Method::DataDome, options)
            .field("captcha_url", captcha_url.into())
            .field("pageurl", pageurl.into())
            .field("userAgent", user_agent.into())
            .field("proxy", proxy)
    }

    pub fn cybersiara(
        master_url_id: impl Into<String>,
        pageurl: impl Into<String>,
        user_agent: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::CyberSiara, options)
            .field("master_url_id", master_url_id.into())
            .field("pageurl", pageurl.into())
            .field("userAgent", user_agent.into())
    }

    pub fn yandex_smart(sitekey: impl Into<String>, url: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Yandex, options)
            .field("sitekey", sitekey.into())
            .field("url", url.into())
    }

    /// VK image captcha with its `steps` array.
    pub fn vkimage(
        files: impl Into<ImageFiles>,
        steps: impl Into<String>,
        options: Options,
    ) -> Result<Self> {
        Self::new(Method::VkImage, options)
            .field("steps", steps.into())
            .images(files.into())
    }

    /// VK token captcha.
    pub fn vkcaptcha(
        redirect_uri: impl Into<String>,
        user_agent: impl Into<String>,
        proxy: Proxy,
        options: Options,
    ) -> Self {
        Self::new(Method::VkCaptcha, options)
            .field("redirect_uri", redirect_uri.into())
            .field("useragent", user_agent.into())
            .field("proxy", proxy)
    }

    pub fn captchafox(
        sitekey: impl Into<String>,
        pageurl: impl Into<String>,
        user_agent: impl Into<String>,
        proxy: Proxy,
        options: Options,
    ) -> Self {
        Self::new(Method::CaptchaFox, options)
            .field("sitekey", sitekey.into())
            .field("pageurl", pageurl.into())
            .field("useragent", user_agent.into())
            .field("proxy", proxy)
    }

    pub fn prosopo(sitekey: impl Into<String>, pageurl: impl Into<String>, options: Options) -> Self {
        Self::new(Method::Prosopo, options)
            .field("sitekey", sitekey.into())
            .field("pageurl", pageurl.into())
    }

    /// Temu: main image and three tiles, all base64.
    pub fn temu(
        body: impl Into<String>,
        part1: impl Into<String>,
        part2: impl Into<String>,
        part3: impl Into<String>,
        options: Options,
    ) -> Self {
        Self::new(Method::TemuImage, options)
            .field("body", body.into())
            .field("part1", part1.into())
            .field("part2", part2.into())
            .field("part3", part3.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio_test::assert_err;

    const B64: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn image() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"jpeg").unwrap();
        file
    }

    async fn request(task: CaptchaTask) -> TaskRequest {
        task.into_request(&MockTransport::new()).await.unwrap()
    }

    fn text(request: &TaskRequest, key: &str) -> Option<String> {
        request.fields.get(key).map(FieldValue::to_wire)
    }

    #[tokio::test]
    async fn test_normal_local_file_is_posted() {
        let img = image();
        let path = img.path().to_str().unwrap();
        let task = CaptchaTask::normal(path, Options::new()).unwrap();
        let request = request(task).await;
        assert_eq!(text(&request, "method").as_deref(), Some("post"));
        assert_eq!(text(&request, "file").as_deref(), Some(path));
    }

    #[tokio::test]
    async fn test_normal_base64_switches_method() {
        let request = request(CaptchaTask::normal(B64, Options::new()).unwrap()).await;
        assert_eq!(text(&request, "method").as_deref(), Some("base64"));
        assert_eq!(text(&request, "body").as_deref(), Some(B64));
        assert!(!request.fields.contains_key("file"));
    }

    #[test]
    fn test_normal_missing_file() {
        assert_err!(CaptchaTask::normal("lost_file", Options::new()));
    }

    #[tokio::test]
    async fn test_recaptcha_defaults_overridable() {
        let task = CaptchaTask::recaptcha(
            "SITE",
            "https://x",
            Options::new().set("version", "v3").set("score", 0.7),
        );
        assert_eq!(task.method(), Method::UserRecaptcha);
        let request = request(task).await;
        assert_eq!(text(&request, "googlekey").as_deref(), Some("SITE"));
        assert_eq!(text(&request, "version").as_deref(), Some("v3"));
        assert_eq!(text(&request, "enterprise").as_deref(), Some("0"));
        assert_eq!(text(&request, "score").as_deref(), Some("0.7"));
    }

    #[test]
    fn test_timeout_selection() {
        let config = SolverConfig::new("KEY");
        let recaptcha = CaptchaTask::recaptcha("s", "u", Options::new());
        let hcaptcha = CaptchaTask::hcaptcha("s", "u", Options::new());
        let custom = CaptchaTask::hcaptcha("s", "u", Options::new().timeout(Duration::from_secs(5)));

        assert_eq!(recaptcha.timeout_for(&config), Duration::from_secs(600));
        assert_eq!(hcaptcha.timeout_for(&config), Duration::from_secs(120));
        assert_eq!(custom.timeout_for(&config), Duration::from_secs(5));
        assert_eq!(hcaptcha.polling_interval_for(&config), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_overrides_fall_back_to_config() {
        let config = SolverConfig::new("KEY");
        let zeroed = CaptchaTask::recaptcha(
            "s",
            "u",
            Options::new()
                .timeout(Duration::ZERO)
                .polling_interval(Duration::ZERO),
        );

        assert_eq!(zeroed.timeout_for(&config), Duration::from_secs(600));
        assert_eq!(zeroed.polling_interval_for(&config), Duration::from_secs(10));

        let custom = CaptchaTask::hcaptcha("s", "u", Options::new().polling_interval(Duration::from_secs(3)));
        assert_eq!(custom.polling_interval_for(&config), Duration::from_secs(3));
    }

    #[test]
    fn test_canvas_requires_hint() {
        let img = image();
        let path = img.path().to_str().unwrap();
        let err = CaptchaTask::canvas(path, Options::new()).unwrap_err();
        assert!(matches!(err, SolverError::Validation(_)));
        assert!(CaptchaTask::canvas(path, Options::new().hint_text("Draw around apple")).is_ok());
    }

    #[test]
    fn test_audio_validation() {
        let err = CaptchaTask::audio(B64, "xx", Options::new()).unwrap_err();
        assert!(err.to_string().contains("xx"));
        assert_err!(CaptchaTask::audio("clip.ogg", "en", Options::new()));
        assert!(CaptchaTask::audio(B64, "en", Options::new()).is_ok());
    }

    #[tokio::test]
    async fn test_audio_local_file_sent_inline() {
        let mut mp3 = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        mp3.write_all(b"ID3").unwrap();
        let task = CaptchaTask::audio(mp3.path().to_str().unwrap(), "en", Options::new()).unwrap();
        let request = request(task).await;
        assert_eq!(text(&request, "method").as_deref(), Some("audio"));
        assert_eq!(text(&request, "body").as_deref(), Some("SUQz"));
        assert_eq!(text(&request, "lang").as_deref(), Some("en"));
        assert!(request.files.is_empty());
    }

    #[tokio::test]
    async fn test_rotate_single_and_many() {
        let img = image();
        let path = img.path().to_str().unwrap();

        let single = request(CaptchaTask::rotate(path, Options::new()).unwrap()).await;
        assert_eq!(text(&single, "method").as_deref(), Some("rotatecaptcha"));
        assert_eq!(text(&single, "file").as_deref(), Some(path));

        let many = request(CaptchaTask::rotate(vec![path, path], Options::new()).unwrap()).await;
        assert_eq!(text(&many, "method").as_deref(), Some("rotatecaptcha"));
        assert_eq!(many.files.len(), 2);
        assert!(many.files.contains_key("file_2"));
        assert!(!many.fields.contains_key("file"));
    }

    #[test]
    fn test_rotate_too_many_files() {
        let img = image();
        let path = img.path().to_str().unwrap();
        let err = CaptchaTask::rotate(vec![path; 10], Options::new()).unwrap_err();
        assert!(matches!(err, SolverError::Validation(_)));
    }

    #[tokio::test]
    async fn test_vkimage_base64_keeps_method() {
        let request = request(CaptchaTask::vkimage(B64, "[5,4,7]", Options::new()).unwrap()).await;
        assert_eq!(text(&request, "method").as_deref(), Some("vkimage"));
        assert_eq!(text(&request, "body").as_deref(), Some(B64));
        assert_eq!(text(&request, "steps").as_deref(), Some("[5,4,7]"));
    }

    #[tokio::test]
    async fn test_token_families_fixed_fields() {
        let proxy = Proxy::new("HTTPS", "u:p@h:1");
        let cases = vec![
            (CaptchaTask::funcaptcha("pk", "u", Options::new()), "funcaptcha", "publickey"),
            (CaptchaTask::capy("k", "u", Options::new()), "capy", "captchakey"),
            (CaptchaTask::mtcaptcha("k", "u", Options::new()), "mt_captcha", "sitekey"),
            (CaptchaTask::yandex_smart("k", "u", Options::new()), "yandex", "sitekey"),
            (CaptchaTask::tencent("k", "u", Options::new()), "tencent", "app_id"),
            (CaptchaTask::cutcaptcha("m", "k", "u", Options::new()), "cutcaptcha", "api_key"),
            (CaptchaTask::lemin("c", "d", "u", Options::new()), "lemin", "div_id"),
            (CaptchaTask::prosopo("k", "u", Options::new()), "prosopo", "pageurl"),
            (
                CaptchaTask::captchafox("k", "u", "UA", proxy.clone(), Options::new()),
                "captchafox",
                "useragent",
            ),
            (
                CaptchaTask::vkcaptcha("r", "UA", proxy.clone(), Options::new()),
                "vkcaptcha",
                "redirect_uri",
            ),
            (
                CaptchaTask::datadome("c", "u", "UA", proxy, Options::new()),
                "datadome",
                "captcha_url",
            ),
            (CaptchaTask::temu(B64, B64, B64, B64, Options::new()), "temuimage", "part3"),
        ];

        for (task, method, key) in cases {
            let request = request(task).await;
            assert_eq!(text(&request, "method").as_deref(), Some(method));
            assert!(request.fields.contains_key(key), "{} lacks {}", method, key);
        }
    }
}
