// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # ChainPress Library
//!
//! ChainPress builds a static article site: markdown pages go through
//! Handlebars templates, author ids are resolved against a data file, the
//! stylesheet is bundled before any page renders, and rendered articles get
//! heading anchors and a table of contents.

#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/chainpress")]
#![crate_name = "chainpress"]
#![crate_type = "lib"]

use crate::content::{articles_collection, discover_pages, ChainSet, Page, PageKind};
use crate::core::config::Config;
use crate::core::traits::{BuildHook, Generator};
use crate::filters::AuthorRegistry;
use crate::generators::{copy_passthrough, HtmlGenerator};
use crate::processors::MarkdownProcessor;
use crate::stylesheet::StylesheetHook;
use crate::template::HandlebarsRenderer;
use log::{debug, info, warn};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

pub use crate::core::error::{ChainPressError, Result};

/// Provides command-line interface utilities.
pub mod cli;

/// Page discovery, chain classification and the articles collection.
pub mod content;

/// Configuration, errors and the traits shared by every build stage.
pub mod core;

/// Author lookup and date formatting for templates.
pub mod filters;

/// Provides output generation utilities.
pub mod generators;

/// Heading anchors and table of contents extraction.
pub mod headings;

/// Frontmatter and markdown processing.
pub mod processors;

/// The stylesheet build step.
pub mod stylesheet;

/// Provides template rendering utilities.
pub mod template;

/// Trait for template rendering implementations.
///
/// This trait defines methods for rendering and validating templates.
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders a template with the specified context.
    ///
    /// # Arguments
    /// * `template` - The template name or identifier.
    /// * `context` - The context data for rendering the template.
    ///
    /// # Returns
    /// * `Result<String>` - The rendered output, or an error if rendering fails.
    fn render(&self, template: &str, context: &JsonValue) -> Result<String>;

    /// Validates the template against the context.
    ///
    /// # Arguments
    /// * `template` - The template name or identifier.
    /// * `context` - The context data.
    ///
    /// # Returns
    /// * `Result<()>` - Indicates success if valid, or an error otherwise.
    fn validate(&self, template: &str, context: &JsonValue) -> Result<()>;
}

/// Counts from one site build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages written.
    pub pages: usize,
    /// Pages in the articles collection.
    pub articles: usize,
    /// Static files copied.
    pub passthrough_files: usize,
}

/// Main site build pipeline for ChainPress.
#[derive(Debug)]
pub struct ChainPress {
    config: Config,
    hooks: Vec<Box<dyn BuildHook>>,
    processor: MarkdownProcessor,
    chains: Arc<ChainSet>,
    generator: Box<dyn Generator>,
}

impl ChainPress {
    /// Creates a pipeline for `config`.
    ///
    /// The stylesheet build is registered as the first hook, and the HTML
    /// generator minifies when the production profile is active.
    pub fn new(config: Config) -> Self {
        let chains = Arc::new(ChainSet::new(config.site.chains.iter().cloned()));
        let generator = HtmlGenerator::new()
            .with_minification(config.profile.is_production());

        Self {
            config,
            hooks: vec![Box::new(StylesheetHook)],
            processor: MarkdownProcessor::default(),
            chains,
            generator: Box::new(generator),
        }
    }

    /// Appends a before-build hook. Hooks run in registration order.
    pub fn with_hook<H: BuildHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the hooks, copies static files and renders every page.
    pub fn build(&self) -> Result<BuildReport> {
        let config = &self.config;

        if !config.input_dir.is_dir() {
            return Err(ChainPressError::config_error(
                format!(
                    "input directory does not exist: {}",
                    config.input_dir.display()
                ),
                Some(config.input_dir.clone()),
            ));
        }

        for hook in &self.hooks {
            debug!("Running before-build hook '{}'", hook.name());
            hook.before_build(config)?;
        }

        let passthrough_files =
            copy_passthrough(&config.site.passthrough, &config.output_dir)?;

        let authors = Arc::new(self.load_authors()?);
        let renderer =
            HandlebarsRenderer::new(&config.includes_path(), authors)?;

        let pages = discover_pages(&config.input_dir, &self.processor, &self.chains)?;
        let articles = articles_collection(&pages);
        let site = serde_json::to_value(&config.custom).map_err(|e| {
            ChainPressError::config_error(
                format!("Custom values are not representable: {}", e),
                None,
            )
        })?;
        let globals = json!({
            "site": site,
            "collections": {
                "articles": articles.iter().map(|page| page.summary()).collect::<Vec<_>>(),
            },
        });

        for page in &pages {
            let html = self.render_page(page, &renderer, &globals)?;
            self.generator
                .generate(&html, &config.output_dir.join(&page.output_path))?;
        }

        let report = BuildReport {
            pages: pages.len(),
            articles: articles.len(),
            passthrough_files,
        };
        info!(
            "Wrote {} pages ({} articles) to {}",
            report.pages,
            report.articles,
            config.output_dir.display()
        );
        Ok(report)
    }

    fn load_authors(&self) -> Result<AuthorRegistry> {
        let path = self.config.authors_path();
        if !path.is_file() {
            warn!("Author data {} not found, author lookups will be empty", path.display());
            return Ok(AuthorRegistry::default());
        }
        AuthorRegistry::from_file(&path)
    }

    fn render_page(
        &self,
        page: &Page,
        renderer: &HandlebarsRenderer,
        globals: &JsonValue,
    ) -> Result<String> {
        let name = page.input_path.display().to_string();

        let mut context = page.data.clone();
        if let JsonValue::Object(globals) = globals {
            for (key, value) in globals {
                _ = context.insert(key.clone(), value.clone());
            }
        }
        _ = context.insert("page".to_string(), page.page_context());
        if let Some(chain) = &page.chain {
            _ = context.insert("chain".to_string(), json!(chain));
        }
        let mut context = JsonValue::Object(context);

        let content = match page.kind {
            PageKind::Markdown if page.uses_template_engine() => {
                let body = renderer.render_source(&name, &page.body, &context)?;
                self.processor.render(&body)
            }
            PageKind::Markdown => self.processor.render(&page.body),
            PageKind::Template => renderer.render_source(&name, &page.body, &context)?,
        };

        let Some(layout) = page.layout() else {
            return Ok(content);
        };
        if let Err(e) = renderer.validate(layout, &context) {
            warn!("{} for {}, writing bare content", e, name);
            return Ok(content);
        }

        context["content"] = JsonValue::String(content);
        renderer.render(layout, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PassthroughCopy, Profile};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(root: &Path) -> Config {
        let src = root.join("src");
        write(&src, "assets/css/main.css", "body {\n  margin: 0;\n}\n");
        write(&src, "assets/favicon.svg", "<svg/>");
        write(
            &src,
            "_data/authors.json",
            r#"[{"id": "satoshi", "name": "Satoshi Nakamoto"}]"#,
        );
        write(
            &src,
            "_includes/article.hbs",
            "<article><h1>{{title}}</h1><p>{{formatDateOnly date}} {{chain}}</p>\
             {{#each (resolveAuthors authors)}}<span>{{name}}</span>{{/each}}\
             <nav>{{#each (extractTocHeadings content)}}<a href=\"#{{id}}\">{{text}}</a>{{/each}}</nav>\
             {{{addHeadingIds content}}}</article>",
        );
        write(&src, "_includes/page.hbs", "<main>{{{content}}}</main>");
        write(
            &src,
            "index.hbs",
            "<ul>{{#each collections.articles}}<li><a href=\"{{url}}\">{{title}}</a> {{chain}}</li>{{/each}}</ul>",
        );
        write(&src, "about.md", "---\ntitle: About\n---\n# {{title}}\n");
        write(
            &src,
            "articles/bitcoin/halving.md",
            "---\ntitle: Halving\ndate: 2024-04-20\nauthors: [satoshi, ghost]\n---\n## Supply\n\n## Supply\n\n### Fees & Tips\n",
        );
        write(
            &src,
            "articles/cosmos/ibc.md",
            "---\ntitle: IBC\ndate: 2023-01-02\n---\n## Packets\n",
        );

        let mut config = Config::default();
        config.input_dir = src.clone();
        config.output_dir = root.join("_site");
        config.css.input = src.join("assets/css/main.css");
        config.css.output = root.join("_site/assets/css/main.css");
        config.site.passthrough = vec![PassthroughCopy::new(
            src.join("assets/favicon.svg"),
            "assets/favicon.svg",
        )];
        config
    }

    #[test]
    fn test_build_site() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        let out = config.output_dir.clone();

        let report = ChainPress::new(config).build().unwrap();
        assert_eq!(
            report,
            BuildReport {
                pages: 4,
                articles: 2,
                passthrough_files: 1
            }
        );

        assert!(out.join("assets/css/main.css").is_file());
        assert!(out.join("assets/favicon.svg").is_file());

        let article =
            fs::read_to_string(out.join("articles/bitcoin/halving/index.html"))
                .unwrap();
        assert!(article.contains("<h1>Halving</h1>"));
        assert!(article.contains("Apr 20, 2024 bitcoin"));
        assert!(article.contains("<span>Satoshi Nakamoto</span>"));
        assert!(!article.contains("ghost"));
        assert!(article.contains(r#"<h2 id="supply">Supply</h2>"#));
        assert!(article.contains(r#"<h2 id="supply-2">Supply</h2>"#));
        assert!(article.contains(r##"<a href="#fees-and-tips">Fees &amp; Tips</a>"##));

        let about = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert_eq!(about, "<main><h1>About</h1>\n</main>");

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert_eq!(
            index,
            "<ul><li><a href=\"/articles/bitcoin/halving/\">Halving</a> bitcoin</li>\
             <li><a href=\"/articles/cosmos/ibc/\">IBC</a> general</li></ul>"
        );
    }

    #[test]
    fn test_production_build_minifies() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = site(temp_dir.path());
        config.profile = Profile::Production;
        let out = config.output_dir.clone();

        let _ = ChainPress::new(config).build().unwrap();
        let css = fs::read_to_string(out.join("assets/css/main.css")).unwrap();
        assert!(!css.contains('\n'));
        let about = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert!(!about.contains('\n'));
    }

    #[test]
    fn test_hooks_run_in_order_before_pages() {
        #[derive(Debug, Default)]
        struct CountingHook(Arc<AtomicUsize>);

        impl BuildHook for CountingHook {
            fn name(&self) -> &str {
                "count-calls"
            }

            fn before_build(&self, config: &Config) -> Result<()> {
                // The stylesheet hook has already run.
                assert!(config.css.output.is_file());
                assert!(!config.output_dir.join("index.html").exists());
                let _ = self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let _ = ChainPress::new(site(temp_dir.path()))
            .with_hook(CountingHook(Arc::clone(&calls)))
            .build()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_stylesheet_aborts_build() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        fs::remove_file(&config.css.input).unwrap();
        let out = config.output_dir.clone();

        assert!(ChainPress::new(config).build().is_err());
        assert!(!out.join("index.html").exists());
    }

    #[test]
    fn test_missing_input_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.input_dir = temp_dir.path().join("nowhere");

        let err = ChainPress::new(config).build().unwrap_err();
        assert!(matches!(err, ChainPressError::ConfigError { .. }));
    }

    #[test]
    fn test_template_engine_override() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        write(
            &config.input_dir,
            "raw.md",
            "---\ntemplateEngineOverride: md\nlayout: false\n---\n`{{title}}`\n",
        );
        let out = config.output_dir.clone();

        let _ = ChainPress::new(config).build().unwrap();
        let raw = fs::read_to_string(out.join("raw/index.html")).unwrap();
        assert_eq!(raw, "<p><code>{{title}}</code></p>\n");
    }

    #[test]
    fn test_missing_layout_writes_bare_content() {
        let temp_dir = TempDir::new().unwrap();
        let config = site(temp_dir.path());
        write(
            &config.input_dir,
            "orphan.md",
            "---\ntitle: Orphan\nlayout: missing\n---\nAlone\n",
        );
        let out = config.output_dir.clone();

        let report = ChainPress::new(config).build().unwrap();
        assert_eq!(report.pages, 5);
        let orphan =
            fs::read_to_string(out.join("orphan/index.html")).unwrap();
        assert_eq!(orphan, "<p>Alone</p>\n");
    }

    #[test]
    fn test_non_html_permalink_in_production() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = site(temp_dir.path());
        config.profile = Profile::Production;
        write(
            &config.input_dir,
            "feed.hbs",
            "---\npermalink: /feed.rss\n---\n<rss>\n  {{#each collections.articles}}<item>{{title}}</item>\n  {{/each}}\n</rss>\n",
        );
        let out = config.output_dir.clone();

        let report = ChainPress::new(config).build().unwrap();
        assert_eq!(report.pages, 5);
        let feed = fs::read_to_string(out.join("feed.rss")).unwrap();
        assert!(feed.starts_with("<rss>\n  <item>Halving</item>"));
        assert!(feed.contains("<item>IBC</item>"));
        assert!(feed.ends_with("</rss>\n"));
    }
}
