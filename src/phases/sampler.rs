//! Year-1 sampler substitution.
//!
//! Year-1 templates carry a placeholder code for their introductory
//! sampler blocks. After every other phase has run, each contiguous
//! placeholder run is rewritten to the concrete sampler sequence:
//! a breast week, a ranked-choice week, then nuclear weeks to the end
//! of the run.

use tracing::info;

use crate::models::Trainee;
use crate::policy::SamplerPolicy;

/// Contiguous runs of the placeholder code, in week order.
fn placeholder_runs(trainee: &Trainee, placeholder: &str) -> Vec<Vec<u32>> {
    let mut runs: Vec<Vec<u32>> = Vec::new();
    for (&week, code) in &trainee.calendar {
        if code != placeholder {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.last() == Some(&(week - 1)) => run.push(week),
            _ => runs.push(vec![week]),
        }
    }
    runs
}

/// The ranked-choice week: whichever of the two alternatives the
/// trainee ranked better; unranked alternatives lose, ties and missing
/// preferences fall back to the first alternative.
fn ranked_choice<'a>(trainee: &Trainee, policy: &'a SamplerPolicy) -> &'a str {
    let (a, b) = (&policy.choice.0, &policy.choice.1);
    let rank_of = |code: &String| {
        trainee
            .sampler_prefs
            .as_ref()
            .and_then(|p| p.rankings.get(code).copied())
            .unwrap_or(u32::MAX)
    };
    if rank_of(b) < rank_of(a) {
        b
    } else {
        a
    }
}

/// Replaces every placeholder run in a year-1 calendar with the
/// concrete sampler sequence. Returns the number of rewritten weeks.
pub fn substitute_sampler(trainee: &mut Trainee, policy: &SamplerPolicy) -> usize {
    let runs = placeholder_runs(trainee, &policy.placeholder);
    let choice = ranked_choice(trainee, policy).to_string();

    let mut rewritten = 0;
    for run in &runs {
        for (position, &week) in run.iter().enumerate() {
            let code = match position {
                0 => policy.first.as_str(),
                1 => choice.as_str(),
                _ => policy.tail.as_str(),
            };
            trainee.calendar.insert(week, code.to_string());
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        info!(person = %trainee.id, weeks = rewritten, "sampler placeholders substituted");
    }
    rewritten
}
