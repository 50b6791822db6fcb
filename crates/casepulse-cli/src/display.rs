//! Vertical card display for case records and poll outcomes.

use casepulse_core::CaseRecord;
use casepulse_dispatch::{BackendError, Change, PollOutcome, PollStatus};

const MAX_WITH_CASES: usize = 10;

// ── Public API ──

/// Print records as cards, grouped in the order given.
pub fn print_records(records: &[CaseRecord]) {
    if records.is_empty() {
        println!("No records.");
        return;
    }
    for record in records {
        print_record_card(record);
    }
    println!("{} record(s)", records.len());
}

pub fn print_record_card(record: &CaseRecord) {
    println!("=== {} [{}] ===", record.case_number(), record.court());
    for (label, value) in card_fields(record) {
        println!("  {:<14} {}", label, value);
    }
    if let CaseRecord::Bombay(b) = record {
        if !b.with_cases.is_empty() {
            println!("  with");
            for w in b.with_cases.iter().take(MAX_WITH_CASES) {
                println!("    - {}: {}", w.case_number, w.details);
            }
            if b.with_cases.len() > MAX_WITH_CASES {
                println!("    ... and {} more", b.with_cases.len() - MAX_WITH_CASES);
            }
        }
    }
    println!();
}

pub fn print_poll(outcome: &PollOutcome) {
    let status = match outcome.status {
        PollStatus::Unchanged => "unchanged",
        PollStatus::Updated => "updated",
        PollStatus::Degraded => "degraded",
    };
    println!("{status}: {} ({} total, {})", outcome.message, outcome.total, outcome.file);
    if outcome.changes.is_empty() {
        if !outcome.new_items.is_empty() {
            println!();
            print_records(&outcome.new_items);
        }
        return;
    }
    println!();
    for change in &outcome.changes {
        match change {
            Change::Added { record } => {
                println!("+ added");
                print_record_card(record);
            }
            Change::Updated { new, .. } => {
                println!("~ updated");
                print_record_card(new);
            }
            Change::Removed { record } => {
                println!("- removed {} [{}]", record.case_number(), record.court());
                println!();
            }
        }
    }
}

/// Report backends that contributed nothing, on stderr.
pub fn print_failures(failures: &[BackendError]) {
    for f in failures {
        eprintln!("warning: {f}");
    }
}

// ── Field extraction ──

fn card_fields(record: &CaseRecord) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    let mut push = |label: &'static str, value: Option<&str>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            out.push((label, v.trim().to_string()));
        }
    };
    match record {
        CaseRecord::Case(c) => {
            push("petitioner", Some(c.petitioner.as_str()));
            push("respondent", Some(c.respondent.as_str()));
            push("advocates", Some(c.advocates.as_str()));
            push("judge", c.judge.as_deref());
            push("court no", c.court_no.as_deref());
            push("date", c.date.as_deref());
        }
        CaseRecord::Bombay(b) => {
            let c = &b.case;
            push("petitioner", Some(c.petitioner.as_str()));
            push("respondent", Some(c.respondent.as_str()));
            push("advocates", Some(c.advocates.as_str()));
            push("judge", c.judge.as_deref());
            push("court no", c.court_no.as_deref());
            push("date", c.date.as_deref());
            push("time", b.court_time.as_deref());
            push("remarks", b.remarks.as_deref());
        }
        CaseRecord::DelhiStatus(d) => {
            push("status", d.status.as_deref());
            push("petitioner", Some(d.petitioner.as_str()));
            push("respondent", Some(d.respondent.as_str()));
            push("advocates", Some(d.advocates.as_str()));
            push("listing", Some(d.listing_info.as_str()));
            push("court no", d.court_no.as_deref());
            push("order", d.order_link.as_deref());
            push("judgment", d.judgment_link.as_deref());
        }
    }
    out
}
