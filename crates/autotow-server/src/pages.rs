// crates/autotow-server/src/pages.rs
// ============================================================================
// Module: AutoTow HTML Pages
// Description: Server-rendered login, dashboard, and report pages.
// Purpose: Turn core view models into escaped HTML documents.
// Dependencies: autotow-core
// ============================================================================

//! ## Overview
//! Every interpolated value passes through [`escape_html`]; record fields,
//! console statements and result cells are all untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use autotow_core::ExperimentRecord;
use autotow_core::Principal;
use autotow_core::QueryOutcome;
use autotow_core::ReportView;
use autotow_core::StatusTone;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Shared stylesheet.
const STYLE: &str = "body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; \
                     background: #f0f2f5; margin: 0; padding: 20px; } .container { max-width: \
                     1100px; margin: 0 auto; background: white; border-radius: 15px; \
                     box-shadow: 0 4px 15px rgba(0,0,0,0.1); overflow: hidden; } .narrow { \
                     max-width: 600px; } .header { background: #2c3e50; color: white; padding: \
                     20px; text-align: center; } .header h1 { margin: 0; font-size: 24px; } \
                     .header p { margin: 5px 0 0; opacity: 0.8; font-size: 14px; } .content { \
                     padding: 20px; } .row { display: flex; justify-content: space-between; \
                     border-bottom: 1px solid #eee; padding: 12px 0; } .label { font-weight: \
                     600; color: #7f8c8d; } .value { color: #2c3e50; } .status-box { \
                     text-align: center; padding: 15px; border-radius: 8px; margin-top: 20px; \
                     font-weight: bold; } .success { background: #e8f5e9; color: #2e7d32; } \
                     .attention { background: #fdecea; color: #c62828; } table { \
                     border-collapse: collapse; width: 100%; font-size: 13px; } th, td { \
                     border: 1px solid #ddd; padding: 6px; text-align: left; } .error { color: \
                     #c62828; font-weight: 600; } textarea { width: 100%; font-family: \
                     monospace; }";

/// Wraps a body in the shared document shell.
fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><meta \
         name=\"viewport\" content=\"width=device-width, initial-scale=1\"><style>{STYLE}</style></head><body>{body}</body></html>",
        escape_html(title)
    )
}

/// Escapes text for HTML element and attribute contexts.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders an optional text field, `-` when missing.
fn or_dash(value: Option<&String>) -> String {
    value.map_or_else(|| "-".to_string(), |text| escape_html(text))
}

// ============================================================================
// SECTION: Login
// ============================================================================

/// Login form, optionally with a failure message.
pub fn login_page(message: Option<&str>) -> String {
    let notice = message
        .map(|text| format!("<p class=\"error\">{}</p>", escape_html(text)))
        .unwrap_or_default();
    let body = format!(
        "<div class=\"container narrow\"><div class=\"header\"><h1>AutoTow Records</h1><p>Sign \
         in to continue</p></div><div class=\"content\">{notice}<form method=\"post\" \
         action=\"/login\"><p><label>Username <input name=\"username\" \
         autocomplete=\"username\" required></label></p><p><label>Password <input \
         type=\"password\" name=\"password\" autocomplete=\"current-password\" \
         required></label></p><p><button type=\"submit\">Sign in</button></p></form></div></div>"
    );
    document("AutoTow Login", &body)
}

// ============================================================================
// SECTION: Dashboard
// ============================================================================

/// Inputs for the dashboard page.
pub struct DashboardView<'a> {
    /// Signed-in principal.
    pub principal: &'a Principal,
    /// Records, newest first.
    pub records: &'a [ExperimentRecord],
    /// Listing failure shown instead of the table.
    pub listing_error: Option<&'a str>,
    /// Last submitted console statement.
    pub query: Option<&'a str>,
    /// Result of the last console statement.
    pub outcome: Option<&'a QueryOutcome>,
}

/// Records table plus the query console.
pub fn dashboard_page(view: &DashboardView<'_>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<div class=\"container\"><div class=\"header\"><h1>AutoTow Dashboard</h1><p>Signed in \
         as {} ({})</p></div><div class=\"content\"><form method=\"post\" \
         action=\"/logout\"><button type=\"submit\">Sign out</button></form>",
        escape_html(view.principal.username.as_str()),
        view.principal.role
    );
    if view.principal.is_admin() {
        body.push_str(
            "<form method=\"post\" action=\"/admin/reset\" onsubmit=\"return confirm('Drop all \
             records and accounts?');\"><button type=\"submit\">Reset database</button></form>",
        );
    }

    body.push_str("<h2>Records</h2>");
    match view.listing_error {
        Some(message) => {
            let _ = write!(body, "<p class=\"error\">{}</p>", escape_html(message));
        }
        None => records_table(&mut body, view.records),
    }

    let _ = write!(
        body,
        "<h2>Query console</h2><form method=\"post\" action=\"/dashboard/query\"><textarea \
         name=\"query\" rows=\"4\">{}</textarea><p><button \
         type=\"submit\">Run</button></p></form>",
        escape_html(view.query.unwrap_or_default())
    );
    if let Some(outcome) = view.outcome {
        query_result(&mut body, outcome);
    }
    body.push_str("</div></div>");
    document("AutoTow Dashboard", &body)
}

/// Appends the records listing.
fn records_table(body: &mut String, records: &[ExperimentRecord]) {
    if records.is_empty() {
        body.push_str("<p>No records yet.</p>");
        return;
    }
    body.push_str(
        "<table><tr><th>ID</th><th>Batch</th><th>Operator</th><th>Material</th><th>Date</\
         th><th>Avg. Speed</th><th>Avg. Temp</th><th>Total Length</th><th>Status</th></tr>",
    );
    for record in records {
        let id = escape_html(record.external_id.as_str());
        let _ = write!(
            body,
            "<tr><td><a href=\"/view/{id}\">{id}</a></td><td>{}</td><td>{}</td><td>{}</\
             td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            or_dash(record.batch_id.as_ref()),
            or_dash(record.operator.as_ref()),
            or_dash(record.material.as_ref()),
            or_dash(record.date.as_ref()),
            record.avg_speed,
            record.avg_temp,
            record.total_length,
            escape_html(&record.status),
        );
    }
    body.push_str("</table>");
}

/// Appends the console result block.
fn query_result(body: &mut String, outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Rows {
            columns,
            rows,
        } => {
            let _ = write!(body, "<p>{} row(s) returned.</p><table><tr>", rows.len());
            for column in columns {
                let _ = write!(body, "<th>{}</th>", escape_html(column));
            }
            body.push_str("</tr>");
            for row in rows {
                body.push_str("<tr>");
                for cell in row {
                    let _ = write!(body, "<td>{}</td>", escape_html(&cell.to_string()));
                }
                body.push_str("</tr>");
            }
            body.push_str("</table>");
        }
        QueryOutcome::Mutation {
            affected,
        } => {
            let _ = write!(body, "<p>Statement executed. {affected} row(s) affected.</p>");
        }
        QueryOutcome::Error {
            kind,
            message,
        } => {
            let _ = write!(
                body,
                "<p class=\"error\">Query failed ({}): {}</p>",
                kind.as_str(),
                escape_html(message)
            );
        }
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Public production report.
pub fn report_page(view: &ReportView) -> String {
    let id = escape_html(&view.external_id);
    let tone = match view.status_tone {
        StatusTone::Success => "success",
        StatusTone::Attention => "attention",
    };
    let body = format!(
        "<div class=\"container narrow\"><div class=\"header\"><h1>AutoTow Production \
         Report</h1><p>ID: {id}</p></div><div class=\"content\"><div class=\"row\"><span \
         class=\"label\">Batch Name:</span> <span class=\"value\">{}</span></div><div \
         class=\"row\"><span class=\"label\">Operator:</span> <span \
         class=\"value\">{}</span></div><div class=\"row\"><span class=\"label\">Material:</span> \
         <span class=\"value\">{}</span></div><div class=\"row\"><span \
         class=\"label\">Date:</span> <span class=\"value\">{}</span></div><hr \
         style=\"border:0; border-top:1px dashed #ccc; margin: 20px 0;\"><div \
         class=\"row\"><span class=\"label\">Avg. Speed:</span> <span class=\"value\">{} \
         m/min</span></div><div class=\"row\"><span class=\"label\">Avg. Temp:</span> <span \
         class=\"value\">{} &deg;C</span></div><div class=\"row\"><span class=\"label\">Total \
         Length:</span> <span class=\"value\">{} m</span></div><div class=\"status-box \
         {tone}\">STATUS: {}</div></div></div>",
        or_dash(view.batch_id.as_ref()),
        or_dash(view.operator.as_ref()),
        or_dash(view.material.as_ref()),
        or_dash(view.date.as_ref()),
        view.avg_speed,
        view.avg_temp,
        view.total_length,
        escape_html(&view.status),
    );
    document(&format!("AutoTow Report - {}", view.external_id), &body)
}

/// Page for an unknown report identifier.
pub fn not_found_page(external_id: &str) -> String {
    let body = format!(
        "<div class=\"content\" style=\"text-align:center; padding:50px;\"><h1 \
         class=\"error\">Report Not Found</h1><p>The ID you are looking for: \
         <b>{}</b> was not found.</p><p>The database might have been reset or the ID is \
         incorrect.</p></div>",
        escape_html(external_id)
    );
    document("Report Not Found", &body)
}

/// Generic titled message page.
pub fn message_page(title: &str, message: &str) -> String {
    let body = format!(
        "<div class=\"content\" style=\"text-align:center; padding:50px;\"><h1>{}</h1><p>{}</p><p><a \
         href=\"/dashboard\">Back to dashboard</a></p></div>",
        escape_html(title),
        escape_html(message)
    );
    document(title, &body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
