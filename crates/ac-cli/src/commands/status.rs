use ac_agents::coordinator::CrossTeamCoordinator;

use super::print_json;

/// Run the `status` subcommand: list every team with its agents.
pub async fn run(coordinator: &CrossTeamCoordinator, json: bool) -> anyhow::Result<()> {
    let caps = coordinator.get_team_capabilities().await;
    if json {
        return print_json(&caps);
    }

    println!("agent-crew status  ({} agents)", caps.total_agents);
    println!("{}", "-".repeat(40));
    for (team, profile) in &caps.teams {
        println!("{team}  ({} agents)", profile.size);
        for agent in &profile.agents {
            println!(
                "  {} {:<20} {:<22} {}",
                agent.status.glyph(),
                agent.name,
                agent.role,
                agent.specialization
            );
        }
    }
    Ok(())
}
