//! Line-oriented REPL over stdin/stdout (§6). Trivial glue, deliberately
//! hand-rolled rather than pulled in through a CLI-flag crate: the surface
//! is a handful of `/command` verbs, not a program's argument grammar.

use std::io::{self, Write};

use domain_types::DomainError;

use crate::app_state::AppState;

pub async fn run(state: AppState) -> io::Result<()> {
    println!("hackbase CLI. Type /help for commands, /quit to exit.");
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        dispatch(&state, line).await;
    }

    Ok(())
}

async fn dispatch(state: &AppState, line: &str) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    let rest: Vec<&str> = parts.collect();

    let result = match command {
        "/help" => {
            print_help();
            Ok(())
        }
        "/teams" => show_teams(state).await,
        "/project" => show_project(state, &rest).await,
        "/join" => join_team(state, &rest).await,
        "/chat" => show_room(state, &rest).await,
        "/chat_create" => create_room(state, &rest).await,
        "/chat_send" => send_message(state, &rest).await,
        "/mentors" => show_mentors(state).await,
        "/persist_save" => {
            state.persist_state().await;
            println!("snapshot saved");
            Ok(())
        }
        "/persist_info" => {
            let info = state.persist_info();
            println!(
                "teams={} projects={} mentors={} rooms={} generated_at={}",
                info.team_count, info.project_count, info.mentor_count, info.room_count, info.generated_at
            );
            Ok(())
        }
        "/cluster_info" => show_cluster_info(state).await,
        "/cluster_connect" => {
            println!("cluster_connect is not supported on a single-host build");
            Ok(())
        }
        "/cluster_nodes" => {
            println!("nodes: [{}]", crate::runtime_env::node_name());
            Ok(())
        }
        "/cluster_ping" => {
            println!("pong");
            Ok(())
        }
        _ => {
            println!("unknown command: {command} (try /help)");
            return;
        }
    };

    if let Err(kind) = result {
        println!("error: {kind}");
    }
}

fn print_help() {
    println!(
        "commands:\n\
         /teams\n\
         /project <team>\n\
         /join <team> <name> <email>\n\
         /chat <room>\n\
         /chat_create <room>\n\
         /chat_send <room> <author> <msg...>\n\
         /mentors\n\
         /persist_save\n\
         /persist_info\n\
         /cluster_info\n\
         /cluster_connect <node>\n\
         /cluster_nodes\n\
         /cluster_ping\n\
         /help\n\
         /quit"
    );
}

async fn show_teams(state: &AppState) -> Result<(), DomainError> {
    let teams = state.list_teams().await?;
    if teams.is_empty() {
        println!("(no teams)");
    }
    for team in teams {
        println!("{} [{}] participants={}", team.name, team.topic, team.participants.len());
    }
    Ok(())
}

async fn show_project(state: &AppState, args: &[&str]) -> Result<(), DomainError> {
    let Some(team) = args.first() else {
        println!("usage: /project <team>");
        return Ok(());
    };
    match state.get_project(team.to_string()).await? {
        Some(project) => {
            println!(
                "{} category={:?} state={:?} progress={} feedback={}",
                project.team_name,
                project.category,
                project.state,
                project.progress.len(),
                project.feedback.len()
            );
        }
        None => println!("no project for team {team}"),
    }
    Ok(())
}

async fn join_team(state: &AppState, args: &[&str]) -> Result<(), DomainError> {
    let [team, name, email] = args else {
        println!("usage: /join <team> <name> <email>");
        return Ok(());
    };
    state
        .add_participant(team.to_string(), name.to_string(), email.to_string())
        .await?;
    println!("{name} joined {team}");
    Ok(())
}

async fn show_room(state: &AppState, args: &[&str]) -> Result<(), DomainError> {
    let Some(room) = args.first() else {
        println!("usage: /chat <room>");
        return Ok(());
    };
    let history = state.history(room.to_string()).await?;
    for message in history {
        println!("[{}] {}: {}", message.timestamp, message.author, message.content);
    }
    Ok(())
}

async fn create_room(state: &AppState, args: &[&str]) -> Result<(), DomainError> {
    let Some(room) = args.first() else {
        println!("usage: /chat_create <room>");
        return Ok(());
    };
    state.create_room(room.to_string()).await?;
    println!("room {room} created");
    Ok(())
}

async fn send_message(state: &AppState, args: &[&str]) -> Result<(), DomainError> {
    if args.len() < 3 {
        println!("usage: /chat_send <room> <author> <msg...>");
        return Ok(());
    }
    let room = args[0].to_string();
    let author = args[1].to_string();
    let content = args[2..].join(" ");
    state.send_message(room, author, content).await?;
    Ok(())
}

async fn show_mentors(state: &AppState) -> Result<(), DomainError> {
    let mentors = state.list_mentors().await?;
    if mentors.is_empty() {
        println!("(no mentors)");
    }
    for mentor in mentors {
        println!("{} {} specialty={}", mentor.id, mentor.name, mentor.specialty);
    }
    Ok(())
}

async fn show_cluster_info(state: &AppState) -> Result<(), DomainError> {
    let info = state.cluster_info().await?;
    println!(
        "node={} holder={} rooms={}",
        info.node_name, info.is_holder, info.room_count
    );
    Ok(())
}
