/// What the operator can type into the server console
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ServerCommand {
    Exit,
    /// Every address that has sent a command
    List,
    Players,
    Ban(String),
}

impl ServerCommand {
    pub fn parse(line: &str) -> Option<ServerCommand> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(name) = line.strip_prefix("ban ") {
            return Some(ServerCommand::Ban(name.to_string()));
        }

        match line {
            "exit" => Some(ServerCommand::Exit),
            "list" => Some(ServerCommand::List),
            "players" => Some(ServerCommand::Players),
            _ => None,
        }
    }
}

/// What a player can type into the client console
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ClientCommand {
    Exit,
    /// A command for the table, sent to the server as typed
    Forward(String),
}

pub const CLIENT_HELP: &str = "Unknown command. List of commands:\nexit\nlogin <name>\nbet <position> <amount>\nbets\nmoney\nroll\nsay <message>";

impl ClientCommand {
    pub fn parse(line: &str) -> Option<ClientCommand> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "exit" {
            return Some(ClientCommand::Exit);
        }

        let forwarded = ["login ", "bet ", "say "]
            .iter()
            .any(|prefix| line.starts_with(prefix))
            || matches!(line, "bets" | "money" | "roll");

        forwarded.then(|| ClientCommand::Forward(line.to_string()))
    }
}

/// The part of a server message worth printing, if it is one the client shows
pub fn displayed_text(message: &str) -> Option<&str> {
    message.strip_prefix("say ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_commands() {
        assert_eq!(ServerCommand::parse("exit\n"), Some(ServerCommand::Exit));
        assert_eq!(ServerCommand::parse("list"), Some(ServerCommand::List));
        assert_eq!(ServerCommand::parse("players"), Some(ServerCommand::Players));
        assert_eq!(
            ServerCommand::parse("ban Sasha\r\n"),
            Some(ServerCommand::Ban("Sasha".to_string()))
        );
        assert_eq!(ServerCommand::parse("kick Sasha"), None);
    }

    #[test]
    fn test_client_commands() {
        assert_eq!(ClientCommand::parse("exit"), Some(ClientCommand::Exit));
        assert_eq!(
            ClientCommand::parse("login Sasha\n"),
            Some(ClientCommand::Forward("login Sasha".to_string()))
        );
        assert_eq!(
            ClientCommand::parse("bets"),
            Some(ClientCommand::Forward("bets".to_string()))
        );
        assert_eq!(ClientCommand::parse("login"), None);
        assert_eq!(ClientCommand::parse("dance"), None);
    }

    #[test]
    fn test_displayed_text() {
        assert_eq!(displayed_text("say hi there"), Some("hi there"));
        assert_eq!(displayed_text("Insufficient money"), None);
    }
}
