//! Plain-text transcript rendering for copy/download

use crate::runtime::Snapshot;
use crate::state_machine::ScriptState;
use std::fmt::Write;

/// File name offered for transcript downloads
pub const TRANSCRIPT_FILE_NAME: &str = "sales_script.txt";

/// Render the conversation so far as a plain-text script.
///
/// Completed turns show the chosen prospect response; the open turn (if
/// any) lists the response options still on offer.
pub fn format_transcript(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## Cold Call Script");
    if let Some(session) = &snapshot.session {
        let _ = writeln!(
            out,
            "Salesperson: {} ({})",
            session.business.user_name, session.business.business_name
        );
        if let Some(company) = &session.customer_company_name {
            let _ = writeln!(out, "Prospect company: {company}");
        }
        let _ = writeln!(out, "Call objective: {}", session.business.sales_goals);
    }

    let user_name = snapshot
        .session
        .as_ref()
        .map_or("Salesperson", |s| s.business.user_name.as_str());

    for (i, turn) in snapshot.history.iter().enumerate() {
        let _ = write!(
            out,
            "\n## Turn {}\n{}: {}\nProspect: {} ({})\n",
            i + 1,
            user_name,
            turn.salesperson_utterance,
            turn.chosen_prospect_response.response_text,
            turn.chosen_prospect_response.response_type,
        );
    }

    if let Some(turn) = snapshot.current_turn() {
        let _ = write!(
            out,
            "\n## Turn {} (current)\n{}: {}\nPossible prospect responses:\n",
            snapshot.history.len() + 1,
            user_name,
            turn.salesperson_utterance,
        );
        for (i, option) in turn.prospect_response_options.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] {}",
                i + 1,
                option.response_type,
                option.response_text
            );
        }
    }

    if let ScriptState::Stalled { message, .. } = &snapshot.state {
        let _ = write!(out, "\n(The last turn request failed: {message})\n");
    }

    out.trim_end().to_string()
}
