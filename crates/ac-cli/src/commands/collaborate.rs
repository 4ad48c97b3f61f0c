use ac_agents::coordinator::CrossTeamCoordinator;

use super::print_json;

/// Run the `collaborate` subcommand: one sub-task per expertise area.
pub async fn run(
    coordinator: &CrossTeamCoordinator,
    description: &str,
    expertise: &[String],
    lead: &str,
    json: bool,
) -> anyhow::Result<()> {
    let results = coordinator
        .collaborative_task(description, expertise, lead)
        .await;
    if json {
        return print_json(&results);
    }

    println!("Collaborative task led by {lead}: {} contributor(s)", results.len());
    for (agent, result) in &results {
        let outcome = if result.is_done() { "done" } else { "failed" };
        println!("  {agent:<20} {outcome}");
    }
    Ok(())
}
