use ac_agents::coordinator::CrossTeamCoordinator;
use ac_core::types::Priority;

use super::print_json;

pub struct DelegateArgs<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: Priority,
}

/// Run the `delegate` subcommand: one cross-team task, executed in place.
pub async fn run(coordinator: &CrossTeamCoordinator, args: DelegateArgs<'_>, json: bool) -> anyhow::Result<()> {
    let result = coordinator
        .delegate_cross_team(args.from, args.to, args.title, args.description, args.priority)
        .await?;
    if json {
        return print_json(&result);
    }

    let outcome = if result.is_done() { "done" } else { "failed" };
    println!("{} -> {}: {outcome} in {:.2}s", args.from, result.completed_by, result.time_taken_seconds);
    println!("{}", result.reasoning_trace);
    if let Some(next) = &result.next_steps {
        println!("Next: {next}");
    }
    Ok(())
}
