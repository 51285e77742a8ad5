#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }

        let prefix = args.remove(0);
        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_edit()
            || cmd.is_attach()
            || cmd.is_new_chat()
            || cmd.is_open()
            || cmd.is_back()
            || cmd.is_forward()
            || cmd.is_show()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Remaining arguments after the first, joined back into text.
    pub fn rest(&self) -> String {
        return self
            .args
            .iter()
            .skip(1)
            .map(|e| return e.as_str())
            .collect::<Vec<&str>>()
            .join(" ");
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_edit(&self) -> bool {
        return ["/e", "/edit"].contains(&self.command.as_str());
    }

    pub fn is_attach(&self) -> bool {
        return ["/a", "/attach"].contains(&self.command.as_str());
    }

    pub fn is_new_chat(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_open(&self) -> bool {
        return ["/o", "/open"].contains(&self.command.as_str());
    }

    pub fn is_back(&self) -> bool {
        return ["/b", "/back"].contains(&self.command.as_str());
    }

    pub fn is_forward(&self) -> bool {
        return ["/f", "/forward"].contains(&self.command.as_str());
    }

    pub fn is_show(&self) -> bool {
        return ["/s", "/show"].contains(&self.command.as_str());
    }
}
