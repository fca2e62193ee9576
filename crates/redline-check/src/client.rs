//! HTTP client for the checking service.
//!
//! One client per configured endpoint. All calls are one-shot: no retries,
//! no cancellation; a timeout is the transport's business and surfaces like
//! any other failed request.

use redline_annotate::AnnotatedText;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{CheckOptions, CheckResponse, RawMatch};
use crate::CheckError;

/// Account credentials for the premium dictionary endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

/// Client for the external checker, synonym, and word-list services.
#[derive(Debug, Clone)]
pub struct CheckerClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Option<Credentials>,
}

impl CheckerClient {
    pub fn new(endpoint: &str) -> Result<Self, CheckError> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: Url::parse(endpoint)?,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one annotated region for checking.
    ///
    /// Returned matches are stream-relative; translate them with
    /// [`Match::from_raw`](crate::Match::from_raw) against the same
    /// annotation that produced the request.
    pub async fn check(
        &self,
        annotated: &AnnotatedText,
        options: &CheckOptions,
    ) -> Result<Vec<RawMatch>, CheckError> {
        let form = build_check_form(annotated, options, self.credentials.as_ref());
        tracing::debug!(
            target: "redline::check",
            stream_len = annotated.interpreted_len(),
            language = %options.language,
            "sending check request"
        );

        let url = self.endpoint.join("v2/check")?;
        let response = self.http.post(url).form(&form).send().await?;
        let body = error_for_status(response).await?;
        let parsed: CheckResponse = serde_json::from_str(&body)?;
        Ok(parsed.matches)
    }

    /// Ranked replacement suggestions for the selected word in a sentence.
    ///
    /// Failures here are local to the synonym feature and never affect the
    /// checking pipeline.
    pub async fn synonyms(
        &self,
        sentence: &str,
        selection: std::ops::Range<usize>,
    ) -> Result<Vec<String>, CheckError> {
        #[derive(Deserialize)]
        struct SynonymResponse {
            #[serde(default)]
            synonyms: Vec<String>,
        }

        let url = self.endpoint.join("synonyms")?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("text", sentence.to_owned()),
                ("from", selection.start.to_string()),
                ("to", selection.end.to_string()),
            ])
            .send()
            .await?;
        let body = error_for_status(response).await?;
        let parsed: SynonymResponse = serde_json::from_str(&body)?;
        Ok(parsed.synonyms)
    }

    /// List the words in the account's remote dictionary.
    pub async fn list_words(&self) -> Result<Vec<String>, CheckError> {
        #[derive(Deserialize)]
        struct WordsResponse {
            #[serde(default)]
            words: Vec<String>,
        }

        let creds = self.require_credentials()?;
        let mut url = self.endpoint.join("v2/words")?;
        url.query_pairs_mut()
            .append_pair("username", &creds.username)
            .append_pair("apiKey", &creds.api_key)
            .append_pair("limit", "1000");
        let response = self.http.get(url).send().await?;
        let body = error_for_status(response).await?;
        let parsed: WordsResponse = serde_json::from_str(&body)?;
        Ok(parsed.words)
    }

    /// Add one word to the account's remote dictionary.
    pub async fn add_word(&self, word: &str) -> Result<(), CheckError> {
        self.word_mutation("v2/words/add", word).await
    }

    /// Delete one word from the account's remote dictionary.
    pub async fn delete_word(&self, word: &str) -> Result<(), CheckError> {
        self.word_mutation("v2/words/delete", word).await
    }

    async fn word_mutation(&self, path: &str, word: &str) -> Result<(), CheckError> {
        let creds = self.require_credentials()?;
        let url = self.endpoint.join(path)?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("word", word),
                ("username", creds.username.as_str()),
                ("apiKey", creds.api_key.as_str()),
            ])
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }

    fn require_credentials(&self) -> Result<&Credentials, CheckError> {
        self.credentials
            .as_ref()
            .ok_or(CheckError::MissingCredentials)
    }
}

/// Read the body, turning a non-success status into a `Status` error that
/// carries a snippet of the server's explanation.
async fn error_for_status(response: reqwest::Response) -> Result<String, CheckError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let mut snippet = body;
        let mut cut = 200.min(snippet.len());
        while cut > 0 && !snippet.is_char_boundary(cut) {
            cut -= 1;
        }
        snippet.truncate(cut);
        return Err(CheckError::Status {
            status: status.as_u16(),
            body: snippet,
        });
    }
    Ok(body)
}

/// Assemble the form fields for one check request.
fn build_check_form(
    annotated: &AnnotatedText,
    options: &CheckOptions,
    credentials: Option<&Credentials>,
) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("data", annotated.stringify()),
        ("language", options.language.clone()),
    ];
    if let Some(tongue) = &options.mother_tongue {
        form.push(("motherTongue", tongue.clone()));
    }
    if options.picky {
        form.push(("level", "picky".to_owned()));
    }
    if !options.enabled_rules.is_empty() {
        form.push(("enabledRules", options.enabled_rules.join(",")));
    }
    if !options.disabled_rules.is_empty() {
        form.push(("disabledRules", options.disabled_rules.join(",")));
    }
    if !options.enabled_categories.is_empty() {
        form.push(("enabledCategories", options.enabled_categories.join(",")));
    }
    if !options.disabled_categories.is_empty() {
        form.push(("disabledCategories", options.disabled_categories.join(",")));
    }
    // Variants are only meaningful when the server picks the language.
    if options.language == "auto" && !options.preferred_variants.is_empty() {
        form.push(("preferredVariants", options.preferred_variants.join(",")));
    }
    if let Some(creds) = credentials {
        form.push(("username", creds.username.clone()));
        form.push(("apiKey", creds.api_key.clone()));
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_annotate::annotate;

    fn field<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_check_form_minimal() {
        let annotated = annotate("hello world").unwrap();
        let form = build_check_form(&annotated, &CheckOptions::default(), None);
        assert!(field(&form, "data").unwrap().contains("hello world"));
        assert_eq!(field(&form, "language"), Some("auto"));
        assert_eq!(field(&form, "level"), None);
        assert_eq!(field(&form, "username"), None);
    }

    #[test]
    fn test_check_form_full_options() {
        let annotated = annotate("hello").unwrap();
        let options = CheckOptions {
            language: "auto".into(),
            mother_tongue: Some("de".into()),
            picky: true,
            enabled_rules: vec!["A".into(), "B".into()],
            disabled_rules: vec!["C".into()],
            enabled_categories: vec![],
            disabled_categories: vec!["STYLE".into()],
            preferred_variants: vec!["en-US".into(), "de-DE".into()],
        };
        let creds = Credentials {
            username: "user@example.com".into(),
            api_key: "key".into(),
        };
        let form = build_check_form(&annotated, &options, Some(&creds));
        assert_eq!(field(&form, "motherTongue"), Some("de"));
        assert_eq!(field(&form, "level"), Some("picky"));
        assert_eq!(field(&form, "enabledRules"), Some("A,B"));
        assert_eq!(field(&form, "disabledRules"), Some("C"));
        assert_eq!(field(&form, "enabledCategories"), None);
        assert_eq!(field(&form, "disabledCategories"), Some("STYLE"));
        assert_eq!(field(&form, "preferredVariants"), Some("en-US,de-DE"));
        assert_eq!(field(&form, "username"), Some("user@example.com"));
    }

    #[test]
    fn test_variants_dropped_for_fixed_language() {
        let annotated = annotate("hello").unwrap();
        let options = CheckOptions {
            language: "en-US".into(),
            preferred_variants: vec!["en-GB".into()],
            ..CheckOptions::default()
        };
        let form = build_check_form(&annotated, &options, None);
        assert_eq!(field(&form, "preferredVariants"), None);
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let client = CheckerClient::new("https://checker.example").unwrap();
        assert!(matches!(
            client.require_credentials(),
            Err(CheckError::MissingCredentials)
        ));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            CheckerClient::new("not a url"),
            Err(CheckError::InvalidEndpoint(_))
        ));
    }
}
