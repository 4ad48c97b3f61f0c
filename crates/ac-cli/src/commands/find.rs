use ac_agents::coordinator::{AgentSummary, CrossTeamCoordinator};

use super::print_json;

/// Run the `find` subcommand: expert discovery across all teams.
pub async fn run(coordinator: &CrossTeamCoordinator, keyword: &str, json: bool) -> anyhow::Result<()> {
    let experts: Vec<AgentSummary> = coordinator
        .find_expert(keyword)
        .await
        .iter()
        .map(|e| e.summary())
        .collect();
    if json {
        return print_json(&experts);
    }

    if experts.is_empty() {
        println!("No expert found for `{keyword}`.");
        return Ok(());
    }
    for e in &experts {
        println!("{:<20} {:<12} {} ({})", e.name, e.team, e.role, e.specialization);
    }
    Ok(())
}
