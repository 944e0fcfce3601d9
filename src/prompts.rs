//! Prompt construction for the LLM collaborators
//!
//! Template text lives in static format strings assembled programmatically;
//! nothing is parsed at runtime. Each builder returns a ready-to-send
//! `LlmRequest`.

use crate::llm::LlmRequest;
use crate::state_machine::state::{CompletedScriptTurn, ProspectResponseOption, SessionContext};
use std::fmt::Write;

const OPENING_SYSTEM_PROMPT: &str = "You are an expert sales scriptwriter, creating the opening of a cold call. \
Your openings are ultra-concise (5-7 seconds, 1-2 short sentences), confident, empathetic, and human. \
You always answer with a single JSON object and nothing else.";

const NEXT_TURN_SYSTEM_PROMPT: &str = "You are an expert sales coach guiding a salesperson through a live cold call. \
Your suggested utterances are concise, human-like, and conversational. \
You always answer with a single JSON object and nothing else.";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert marketing analyst. You analyze website content and extract \
key information for sales script personalization. \
You always answer with a single JSON object and nothing else.";

/// JSON shape both turn generators are constrained to
const TURN_OUTPUT_FORMAT: &str = r#"Output format requirements (a single JSON object, no markdown):
- "salespersonUtterance": what the salesperson should say for this turn. Concise, engaging, human-like. Plain text only.
- "prospectResponseOptions": an array of 2 to 4 distinct, plausible short responses the prospect might give (e.g. "Okay, what is it?", "I'm busy right now.", "Not interested."). Each option has "responseText" and "responseType" ("positive" for interest, "neutral" for inquiry or deferral, "negative_objection" for disinterest or an objection)."#;

/// Generous output ceiling; a turn is a couple of sentences plus options
const TURN_MAX_TOKENS: u32 = 1024;
const ANALYSIS_MAX_TOKENS: u32 = 1024;

fn company_display(session: &SessionContext) -> &str {
    session
        .customer_company_name
        .as_deref()
        .unwrap_or("The prospect's company")
}

/// Build the opening-turn request.
pub fn build_opening_request(session: &SessionContext) -> LlmRequest {
    let company = company_display(session);
    let business = &session.business;

    let mut body = String::new();
    let _ = write!(
        body,
        "Craft the opening statement of a cold call for {user} from {biz}. \
         The primary goal of this opening is to immediately capture attention and earn a few more seconds.\n\n\
         Salesperson details:\n\
         - Name: {user}\n\
         - Company: {biz}\n\
         - Product/Service: {product}\n\
         - Call objective: {goals}\n\n\
         Target customer information (use this to find a compelling, specific hook):\n\
         - Customer company name (if identified): {company}\n\
         - Insights about their business/website/activities: {context}\n\n\
         Instructions for the opening statement:\n\
         - It MUST be ultra-concise (1-2 short sentences, aiming for 5-7 seconds).\n\
         - Create a hook by referencing a specific, positive, or noteworthy insight from the insights above.\n\
         - The insights may contain \"Not clearly specified\" for some fields. Never repeat such placeholder \
           phrases in the script. If specific positive insights are scarce, infer their industry and hook on a \
           general benefit of {product} for that industry; if the industry is also unclear, open with an \
           intriguing statement about a common business challenge {product} addresses.\n\
         - Sound natural, human, and engaging. Avoid overly formal or robotic language.\n\n\
         {format}\n\n\
         Generate the initial script turn:",
        user = business.user_name,
        biz = business.business_name,
        product = business.product_service,
        goals = business.sales_goals,
        company = company,
        context = session.customer_context,
        format = TURN_OUTPUT_FORMAT,
    );

    LlmRequest::with_system(OPENING_SYSTEM_PROMPT, body).max_tokens(TURN_MAX_TOKENS)
}

/// Build the next-turn request from the full chronological history and the
/// just-chosen prospect response.
pub fn build_next_turn_request(
    session: &SessionContext,
    history: &[CompletedScriptTurn],
    last_response: &ProspectResponseOption,
) -> LlmRequest {
    let business = &session.business;
    let who = match &session.customer_company_name {
        Some(name) => format!("a representative from {name}"),
        None => format!(
            "a representative from a company matching this description: {}",
            session.customer_context
        ),
    };

    let mut body = String::new();
    let _ = write!(
        body,
        "You are guiding {user} from {biz} through a cold call.\n\
         They are selling: {product}.\n\
         Their goal for this call is: {goals}.\n\
         They are speaking with {who}.\n\n\
         Conversation history:\n\
         {history}\n\n\
         The prospect just said: \"{last_text}\" ({last_type})\n\n\
         Based on this, what should {user} say next?\n\
         - If the prospect's last response was 'negative_objection', acknowledge it and gently pivot or ask a clarifying question.\n\
         - If 'positive', build on the interest.\n\
         - If 'neutral', engage further or qualify.\n\
         - Directly reference the prospect's last response if natural.\n\
         - Keep the overall call objective ({goals}) in mind.\n\n\
         {format}\n\n\
         Generate the next script turn:",
        user = business.user_name,
        biz = business.business_name,
        product = business.product_service,
        goals = business.sales_goals,
        who = who,
        history = render_history(history),
        last_text = last_response.response_text,
        last_type = last_response.response_type,
        format = TURN_OUTPUT_FORMAT,
    );

    LlmRequest::with_system(NEXT_TURN_SYSTEM_PROMPT, body).max_tokens(TURN_MAX_TOKENS)
}

/// Build the website-analysis request for the summarizer.
pub fn build_website_analysis_request(url: &str, website_content: &str) -> LlmRequest {
    let mut body = String::new();
    let _ = write!(
        body,
        "Analyze the website content below (from {url}) and extract key information for sales \
         script personalization.\n\n\
         Output requirements (a single JSON object, no markdown):\n\
         1. \"companyName\": the primary name of the business or organization. Omit the field or use an \
         empty string if not clearly identifiable.\n\
         2. \"summary\": a concise summary covering:\n\
         - Core products/services: what do they primarily offer? (If not clear, state \"Not clearly specified\")\n\
         - Target audience: who are their typical customers or users? (If not clear, state \"Not clearly specified\")\n\
         - Key value propositions: what makes them stand out, what problems do they solve? (If not clear, state \"Not clearly specified\")\n\
         - Recent news/notable mentions (optional): briefly note anything that stands out.\n\n\
         The summary must be factual and directly derived from the content; state \"Not clearly specified\" \
         rather than making assumptions. Do not include the company name in the summary field itself.\n\n\
         Website content:\n\
         {content}",
        url = url,
        content = website_content,
    );

    LlmRequest::with_system(ANALYSIS_SYSTEM_PROMPT, body).max_tokens(ANALYSIS_MAX_TOKENS)
}

/// Render history in strict chronological order, one exchange per entry.
pub fn render_history(history: &[CompletedScriptTurn]) -> String {
    let mut rendered = String::new();
    for (i, turn) in history.iter().enumerate() {
        if i > 0 {
            rendered.push('\n');
        }
        let _ = write!(
            rendered,
            "salesperson: {}\nprospect: {} ({})",
            turn.salesperson_utterance,
            turn.chosen_prospect_response.response_text,
            turn.chosen_prospect_response.response_type,
        );
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::state::{BusinessInfo, ResponseType, ScriptTurn};

    fn session() -> SessionContext {
        SessionContext {
            business: BusinessInfo {
                user_name: "Jo".to_string(),
                business_name: "Acme Outreach".to_string(),
                product_service: "CRM software".to_string(),
                sales_goals: "schedule a demo".to_string(),
            },
            customer_context: "They sell widgets to retailers.".to_string(),
            customer_company_name: Some("Widget Works".to_string()),
        }
    }

    fn completed(utterance: &str, response: &str, response_type: ResponseType) -> CompletedScriptTurn {
        ScriptTurn {
            salesperson_utterance: utterance.to_string(),
            prospect_response_options: vec![
                ProspectResponseOption {
                    response_text: response.to_string(),
                    response_type,
                },
                ProspectResponseOption {
                    response_text: "Something else".to_string(),
                    response_type: ResponseType::Neutral,
                },
            ],
        }
        .complete(ProspectResponseOption {
            response_text: response.to_string(),
            response_type,
        })
    }

    #[test]
    fn test_render_history_format() {
        let history = vec![
            completed("Hi, this is Jo.", "Okay, what is it?", ResponseType::Neutral),
            completed("We help retailers.", "Not interested.", ResponseType::NegativeObjection),
        ];
        let rendered = render_history(&history);
        assert_eq!(
            rendered,
            "salesperson: Hi, this is Jo.\n\
             prospect: Okay, what is it? (neutral)\n\
             salesperson: We help retailers.\n\
             prospect: Not interested. (negative_objection)"
        );
    }

    #[test]
    fn test_render_history_empty() {
        assert_eq!(render_history(&[]), "");
    }

    #[test]
    fn test_opening_request_embeds_session_fields() {
        let request = build_opening_request(&session());
        let body = &request.messages[0].text;
        assert!(body.contains("Jo"));
        assert!(body.contains("Acme Outreach"));
        assert!(body.contains("CRM software"));
        assert!(body.contains("schedule a demo"));
        assert!(body.contains("Widget Works"));
        assert!(body.contains("They sell widgets to retailers."));
        assert!(body.contains("salespersonUtterance"));
        assert!(request.system.is_some());
    }

    #[test]
    fn test_opening_request_without_company_name() {
        let mut session = session();
        session.customer_company_name = None;
        let request = build_opening_request(&session);
        assert!(request.messages[0].text.contains("The prospect's company"));
    }

    #[test]
    fn test_next_turn_request_embeds_history_and_last_response() {
        let history = vec![completed(
            "Hi, this is Jo.",
            "I'm busy right now.",
            ResponseType::Neutral,
        )];
        let last = ProspectResponseOption {
            response_text: "I'm busy right now.".to_string(),
            response_type: ResponseType::Neutral,
        };
        let request = build_next_turn_request(&session(), &history, &last);
        let body = &request.messages[0].text;
        assert!(body.contains("salesperson: Hi, this is Jo."));
        assert!(body.contains("prospect: I'm busy right now. (neutral)"));
        assert!(body.contains("The prospect just said: \"I'm busy right now.\" (neutral)"));
        assert!(body.contains("Widget Works"));
    }

    #[test]
    fn test_next_turn_request_falls_back_to_context_description() {
        let mut session = session();
        session.customer_company_name = None;
        let request = build_next_turn_request(&session, &[], &ProspectResponseOption {
            response_text: "Go on.".to_string(),
            response_type: ResponseType::Positive,
        });
        assert!(request.messages[0]
            .text
            .contains("a company matching this description: They sell widgets to retailers."));
    }

    #[test]
    fn test_website_analysis_request_embeds_content() {
        let request = build_website_analysis_request("https://acme.example", "We make widgets.");
        let body = &request.messages[0].text;
        assert!(body.contains("https://acme.example"));
        assert!(body.contains("We make widgets."));
        assert!(body.contains("companyName"));
        assert!(body.contains("Not clearly specified"));
    }
}
