use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    Page,
};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    errors::{SolverError, SolverResult},
    models::domain::PageContent,
};

const VISIBLE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";
const RESULT_SELECTOR: &str = "#result";
/// The resource count must hold still this long before the page counts as idle.
const NETWORK_IDLE_MS: u64 = 500;
const NETWORK_POLL_MS: u64 = 100;

/// Renders a URL and returns what a person would see on it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> SolverResult<PageContent>;
}

/// Browser settings for [`ChromiumPageFetcher`].
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub no_sandbox: bool,
    pub navigation_timeout: Duration,
    pub render_settle: Duration,
}

impl BrowserSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.browser_headless,
            no_sandbox: config.browser_no_sandbox,
            navigation_timeout: config.navigation_timeout(),
            render_settle: config.render_settle(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder().request_timeout(self.navigation_timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder.build()
    }
}

/// A running browser plus the task draining its CDP events.
///
/// Dropping the session aborts the handler task and `Browser`'s own drop kills
/// the Chrome process, so every exit path releases the browser.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self, String> {
        let config = settings.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("failed to launch browser: {}", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            log::debug!("Browser process wait failed: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Headless Chromium implementation of [`PageFetcher`]. One browser per fetch.
pub struct ChromiumPageFetcher {
    settings: BrowserSettings,
}

impl ChromiumPageFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    async fn render(&self, session: &BrowserSession, url: &str) -> Result<PageContent, String> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("failed to open page: {}", e))?;

        match tokio::time::timeout(self.settings.navigation_timeout, navigate(&page, url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(format!(
                    "navigation timed out after {}ms",
                    self.settings.navigation_timeout.as_millis()
                ))
            }
        }

        // Client-side scripts fill the page after the load event.
        wait_for_network_idle(&page, self.settings.navigation_timeout).await;
        tokio::time::sleep(self.settings.render_settle).await;

        let html = page
            .content()
            .await
            .map_err(|e| format!("failed to read page HTML: {}", e))?;
        let visible_text = page
            .evaluate(VISIBLE_TEXT_SCRIPT)
            .await
            .map_err(|e| format!("failed to read page text: {}", e))?
            .into_value::<serde_json::Value>()
            .map_err(|e| format!("failed to read page text: {}", e))
            .and_then(as_page_text)?;
        let title = page.get_title().await.ok().flatten().unwrap_or_default();
        let result_text = match page.find_element(RESULT_SELECTOR).await {
            Ok(element) => element.inner_text().await.ok().flatten(),
            Err(_) => None,
        };

        if let Err(e) = page.close().await {
            log::debug!("Failed to close page {}: {}", url, e);
        }

        Ok(PageContent {
            html,
            visible_text,
            title,
            result_text,
        })
    }
}

async fn navigate(page: &Page, url: &str) -> Result<(), String> {
    page.goto(url)
        .await
        .map_err(|e| format!("navigation failed: {}", e))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| format!("page did not finish loading: {}", e))?;
    Ok(())
}

fn as_page_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(text) => Ok(text),
        other => Err(format!("page text was not a string: {}", other)),
    }
}

/// Polls the Resource Timing buffer until no new requests start for
/// [`NETWORK_IDLE_MS`] and the document is complete, or `budget` runs out.
fn network_idle_script(budget: Duration) -> String {
    format!(
        r#"(async () => {{
            const budgetMs = {budget_ms};
            const start = Date.now();
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            let last = count();
            let stableMs = 0;
            while (Date.now() - start < budgetMs) {{
                await new Promise(r => setTimeout(r, {poll_ms}));
                const current = count();
                if (document.readyState === 'complete' && current === last) {{
                    stableMs += {poll_ms};
                    if (stableMs >= {idle_ms}) {{
                        return {{ idle: true, resources: current, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                last = current;
            }}
            return {{ idle: false, resources: last, waitedMs: Date.now() - start }};
        }})()"#,
        budget_ms = budget.as_millis(),
        poll_ms = NETWORK_POLL_MS,
        idle_ms = NETWORK_IDLE_MS,
    )
}

/// Best effort: a page that never goes quiet is still read after `budget`.
async fn wait_for_network_idle(page: &Page, budget: Duration) {
    let evaluation = page.evaluate(network_idle_script(budget));
    let outcome = match tokio::time::timeout(budget + Duration::from_secs(1), evaluation).await {
        Ok(Ok(result)) => result.into_value::<serde_json::Value>().ok(),
        Ok(Err(e)) => {
            log::debug!("Network-idle check failed: {}", e);
            None
        }
        Err(_) => None,
    };

    match outcome {
        Some(info) if info["idle"].as_bool() == Some(true) => log::debug!(
            "Network idle after {}ms ({} resources)",
            info["waitedMs"],
            info["resources"]
        ),
        _ => log::warn!(
            "Network did not go idle within {}ms; reading page anyway",
            budget.as_millis()
        ),
    }
}

#[async_trait]
impl PageFetcher for ChromiumPageFetcher {
    async fn fetch(&self, url: &str) -> SolverResult<PageContent> {
        log::info!("Fetching page: {}", url);

        let session = BrowserSession::launch(&self.settings)
            .await
            .map_err(|reason| SolverError::page_fetch(url, reason))?;

        let rendered = self.render(&session, url).await;
        session.close().await;

        let page = rendered.map_err(|reason| SolverError::page_fetch(url, reason))?;
        log::info!(
            "Fetched {} ({} chars of text, title '{}')",
            url,
            page.visible_text.len(),
            page.title
        );
        Ok(page)
    }
}
