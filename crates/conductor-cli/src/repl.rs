//! Interactive chat loop

use std::path::PathBuf;

use console::style;
use conductor_core::Manager;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Where chat history is kept between runs
pub fn history_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "conductor", "conductor")
        .map(|dirs| dirs.data_dir().join("history.txt"))
}

/// What a slash command asks the loop to do next
enum CommandResult {
    Continue,
    Exit,
}

pub struct ChatRepl {
    manager: Manager,
    output_dir: PathBuf,
}

impl ChatRepl {
    pub fn new(manager: Manager, output_dir: PathBuf) -> Self {
        Self { manager, output_dir }
    }

    pub async fn run(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        let history = history_path();
        if let Some(path) = &history {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline(&format!("{} ", style(">").bold().cyan())) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    if line.starts_with('/') {
                        if let CommandResult::Exit = self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.process_request(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("{}", style(format!("Error: {:?}", err)).red());
                    break;
                }
            }
        }

        if let Some(path) = &history {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", style("Conductor - Chat Mode").bold().cyan());
        println!();
        self.print_active_agents();
        println!("Results are saved under {}", style(self.output_dir.display()).dim());
        println!();
        println!("Type {} for commands.", style("/help").cyan());
        println!();
    }

    fn print_active_agents(&self) {
        let active = self.manager.list_active_agents();
        if active.is_empty() {
            println!("Active agents: {}", style("none").yellow());
        } else {
            println!("Active agents: {}", style(active.join(", ")).green());
        }
        if self.manager.is_code_generator_mode() {
            println!(
                "{}",
                style("Code generator mode: requests go straight to the code generator.").dim()
            );
        }
    }

    fn handle_command(&mut self, line: &str) -> CommandResult {
        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).unwrap_or_default();

        match command {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                return CommandResult::Exit;
            }
            "/help" | "/h" | "/?" => {
                println!();
                println!("Commands:");
                println!("  /agents            - List registered agents");
                println!("  /use <id,id,...>   - Activate agents and start a new session");
                println!("  /new               - Start a new session with the same agents");
                println!("  /output            - Show where the merged analysis is saved");
                println!("  /quit, /exit, /q   - Exit chat");
                println!();
            }
            "/agents" => {
                let active = self.manager.list_active_agents();
                println!();
                for agent in self.manager.all_agent_descriptors() {
                    let marker = if active.contains(&agent.id) {
                        style("●").green()
                    } else {
                        style("○").dim()
                    };
                    println!("  {} {}", marker, style(&agent.id).bold());
                }
                println!();
            }
            "/use" => {
                let ids: Vec<&str> = argument
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .collect();
                self.activate(&ids);
            }
            "/new" => {
                let ids = self.manager.list_active_agents();
                self.activate(&ids);
            }
            "/output" => {
                println!("{}", style(self.manager.output_location()).dim());
            }
            _ => {
                println!("Unknown command: {}", command);
                println!("Type /help for available commands");
            }
        }
        CommandResult::Continue
    }

    fn activate<S: AsRef<str>>(&mut self, ids: &[S]) {
        match self.manager.set_active_agents(ids) {
            Ok(()) => {
                tracing::info!(agents = ?self.manager.list_active_agents(), "Activated agents");
                println!("{}", style("Started a new session.").dim());
                self.print_active_agents();
            }
            Err(e) => {
                tracing::warn!("Activation failed, keeping previous agents: {}", e);
                eprintln!("{}", style(format!("Error: {}", e)).red());
            }
        }
    }

    async fn process_request(&mut self, request: &str) {
        println!();
        match self.manager.generate_response(request).await {
            Ok(response) => {
                println!("{}: {}", style("Manager").bold().green(), response);
            }
            Err(e) => {
                tracing::debug!("Request failed: {}", e);
                eprintln!("{}", style(format!("Error: {}", e)).red());
            }
        }
        println!();
    }
}
