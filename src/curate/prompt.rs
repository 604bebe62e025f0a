// src/curate/prompt.rs
//! Instruction templates for the ranking model. Guidance differs per category; the output
//! contract is the same for all of them.

use crate::category::Category;

const OUTPUT_CONTRACT: &str = r#"{"news":[{"title":"Clear, engaging headline (max 100 chars)","summary":"Concise 2-3 sentence summary focusing on key facts and implications (max 250 chars)","url":"original_article_url","source":"publication_name","relevance":"Brief explanation of why this is significant (max 100 chars)"}]}"#;

fn guidance(category: Category, max_output: usize) -> String {
    match category {
        Category::Ai => format!(
            "You are an expert AI technology news curator for a daily Discord newsletter. \
Your task is to analyze the provided news articles and select the TOP {max_output} most significant AI technology developments.

## EVALUATION CRITERIA (in order of priority):

1. **IMPACT SIGNIFICANCE** (40% weight)
   - Major product launches or updates from leading AI companies
   - Breakthrough research publications or discoveries
   - Significant funding rounds or acquisitions in AI
   - New AI regulations or policy changes

2. **RECENCY & RELEVANCE** (25% weight)
   - Prefer articles published within the last 24-48 hours
   - Breaking news takes priority over older stories

3. **TECHNICAL INNOVATION** (20% weight)
   - New AI model architectures or capabilities
   - Novel applications, benchmarks, open-source releases

4. **BUSINESS & MARKET IMPACT** (15% weight)
   - Market-moving announcements and strategic decisions

## SELECTION RULES:
INCLUDE: reputable tech publications, official company announcements, major AI model updates, regulatory developments
EXCLUDE: duplicate stories, opinion pieces without new info, marketing content, unverified rumors

## DUPLICATE HANDLING:
If multiple articles cover the same story, select the most comprehensive and recent version."
        ),
        Category::Global => format!(
            "You are an expert business and technology news curator for a daily Discord newsletter. \
Select the TOP {max_output} most significant global business, technology, and cryptocurrency developments.

## EVALUATION CRITERIA (in order of priority):

1. **MARKET IMPACT** (40% weight): major market movements, IPOs, significant business decisions
2. **INNOVATION** (25% weight): new tech products, crypto developments, breakthrough innovations
3. **RECENCY** (20% weight): prefer articles from the last 24-48 hours
4. **GLOBAL SIGNIFICANCE** (15% weight): stories affecting multiple markets or regions

## SELECTION RULES:
INCLUDE: reputable publications, official announcements, market-moving news
EXCLUDE: duplicates, opinion pieces, unverified rumors"
        ),
    }
}

/// Full instruction payload: guidance, the embedded articles and the required output shape.
pub fn render(category: Category, max_output: usize, articles_json: &str) -> String {
    format!(
        "{guidance}\n\n## ARTICLES:\n\n{articles_json}\n\n\
Return ONLY a JSON object with at most {max_output} items ranked by importance, \
exactly in this structure (no markdown, no commentary):\n\n{OUTPUT_CONTRACT}",
        guidance = guidance(category, max_output),
    )
}
