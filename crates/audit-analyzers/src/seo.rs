//! SEO analyzer: title/description presence and length, heading
//! structure, link classification, and a readability estimate.

use crate::context::PageContext;
use crate::outcome::AnalyzerOutcome;
use crate::trait_def::Analyzer;
use async_trait::async_trait;
use audit_types::{HeadingCounts, LinkCounts, MetaTag, SeoSection, SocialTags};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

pub struct SeoAnalyzer;

#[async_trait]
impl Analyzer for SeoAnalyzer {
    type Output = SeoSection;

    fn name(&self) -> &'static str {
        "seo"
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn analyze(&self, ctx: &PageContext<'_>) -> AnalyzerOutcome<Self::Output> {
        let document = Html::parse_document(ctx.html);

        let title = extract_title(&document);
        let description = extract_meta_content(&document, "description");
        let keywords = extract_meta_content(&document, "keywords").map(|m| m.content.unwrap_or_default());
        let headings = count_headings(&document);
        let word_count = word_count(&document);
        let readability_score = readability_score(&document, word_count);
        let links = classify_links(&document, ctx.final_url);
        let social = extract_social_tags(&document);

        let score = score_seo(&title, &description, &headings, word_count);

        AnalyzerOutcome::ok(SeoSection {
            title,
            description,
            keywords,
            headings,
            readability_score,
            word_count,
            links,
            social,
            semantic_topics: Vec::new(),
            score,
        })
    }
}

fn extract_title(document: &Html) -> MetaTag {
    let Ok(sel) = Selector::parse("title") else {
        return MetaTag { present: false, length: 0, content: None };
    };
    match document.select(&sel).next() {
        Some(el) => {
            let text = el.text().collect::<String>().trim().to_string();
            MetaTag {
                present: !text.is_empty(),
                length: text.chars().count() as u32,
                content: Some(text),
            }
        }
        None => MetaTag { present: false, length: 0, content: None },
    }
}

fn extract_meta_content(document: &Html, name: &str) -> Option<MetaTag> {
    let sel = Selector::parse("meta[name], meta[property]").ok()?;
    for el in document.select(&sel) {
        let attr_name = el
            .value()
            .attr("name")
            .or_else(|| el.value().attr("property"))
            .unwrap_or("");
        if attr_name.eq_ignore_ascii_case(name) {
            let content = el.value().attr("content").unwrap_or("").to_string();
            return Some(MetaTag {
                present: !content.is_empty(),
                length: content.chars().count() as u32,
                content: Some(content),
            });
        }
    }
    Some(MetaTag { present: false, length: 0, content: None })
}

fn count_tag(document: &Html, tag: &str) -> u32 {
    Selector::parse(tag)
        .map(|sel| document.select(&sel).count() as u32)
        .unwrap_or(0)
}

fn count_headings(document: &Html) -> HeadingCounts {
    HeadingCounts {
        h1: count_tag(document, "h1"),
        h2: count_tag(document, "h2"),
        h3: count_tag(document, "h3"),
        h4: count_tag(document, "h4"),
        h5: count_tag(document, "h5"),
        h6: count_tag(document, "h6"),
    }
}

fn word_count(document: &Html) -> u32 {
    let Ok(sel) = Selector::parse("body") else {
        return 0;
    };
    document
        .select(&sel)
        .next()
        .map(|body| body.text().collect::<String>().split_whitespace().count() as u32)
        .unwrap_or(0)
}

/// A coarse Flesch-style estimate: shorter average words and sentences
/// score higher. Not a substitute for a real readability library, but
/// enough to flag pages with dense, unbroken prose.
fn readability_score(document: &Html, word_count: u32) -> u8 {
    if word_count == 0 {
        return 0;
    }
    let Ok(sel) = Selector::parse("body") else {
        return 0;
    };
    let text = document
        .select(&sel)
        .next()
        .map(|b| b.text().collect::<String>())
        .unwrap_or_default();

    let sentence_count = text.matches(['.', '!', '?']).count().max(1) as f64;
    let words_per_sentence = word_count as f64 / sentence_count;
    let syllables_per_word = 1.4; // rough English average, no dictionary available

    let flesch = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    flesch.round().clamp(0.0, 100.0) as u8
}

fn classify_links(document: &Html, page_url: &str) -> LinkCounts {
    let Ok(sel) = Selector::parse("a[href]") else {
        return LinkCounts { internal: 0, external: 0 };
    };
    let base = Url::parse(page_url).ok();
    let mut internal = 0u32;
    let mut external = 0u32;

    for link in document.select(&sel) {
        let Some(href) = link.value().attr("href") else { continue };
        let is_external = match (&base, Url::parse(href).ok()) {
            (Some(base), Some(target)) => target.host_str() != base.host_str(),
            (Some(base), None) => {
                base.join(href).is_err() // unresolvable relative href, treat conservatively
            }
            _ => !href.starts_with('/') && !href.starts_with('#'),
        };
        if is_external {
            external += 1;
        } else {
            internal += 1;
        }
    }

    LinkCounts { internal, external }
}

fn extract_social_tags(document: &Html) -> SocialTags {
    let og = Selector::parse(r#"meta[property^="og:"]"#).ok();
    let twitter = Selector::parse(r#"meta[name^="twitter:"]"#).ok();
    SocialTags {
        open_graph_present: og.map(|s| document.select(&s).next().is_some()).unwrap_or(false),
        twitter_card_present: twitter.map(|s| document.select(&s).next().is_some()).unwrap_or(false),
    }
}

fn score_seo(title: &MetaTag, description: &MetaTag, headings: &HeadingCounts, word_count: u32) -> u8 {
    let mut deductions = 0i64;
    if !title.present {
        deductions += 20;
    } else if !(30..=60).contains(&title.length) {
        deductions += 10;
    }
    if !description.present {
        deductions += 20;
    } else if !(70..=160).contains(&description.length) {
        deductions += 10;
    }
    if headings.h1 == 0 {
        deductions += 15;
    } else if headings.h1 > 1 {
        deductions += 5;
    }
    if word_count < 300 {
        deductions += 10;
    }
    (100 - deductions).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(present: bool, length: u32) -> MetaTag {
        MetaTag { present, length, content: None }
    }

    #[test]
    fn well_formed_page_scores_well() {
        let title = meta(true, 45);
        let description = meta(true, 120);
        let headings = HeadingCounts { h1: 1, h2: 3, h3: 0, h4: 0, h5: 0, h6: 0 };
        assert_eq!(score_seo(&title, &description, &headings, 500), 100);
    }

    #[test]
    fn missing_title_and_description_cost_more_than_length_issues() {
        let missing = meta(false, 0);
        let headings = HeadingCounts { h1: 1, h2: 0, h3: 0, h4: 0, h5: 0, h6: 0 };
        let missing_score = score_seo(&missing, &missing, &headings, 500);

        let too_long = meta(true, 200);
        let long_score = score_seo(&too_long, &too_long, &headings, 500);

        assert!(missing_score < long_score);
    }

    #[test]
    fn multiple_h1_costs_less_than_zero_h1() {
        let title = meta(true, 45);
        let description = meta(true, 120);
        let zero = HeadingCounts { h1: 0, h2: 0, h3: 0, h4: 0, h5: 0, h6: 0 };
        let two = HeadingCounts { h1: 2, h2: 0, h3: 0, h4: 0, h5: 0, h6: 0 };
        assert!(score_seo(&title, &description, &zero, 500) < score_seo(&title, &description, &two, 500));
    }
}
