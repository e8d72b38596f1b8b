use colloquy::{Action, ActionRecord, RuleModel, TurnResult};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_turn(input: &str, res: &TurnResult, color: bool) {
    let palette = ansi::Palette::new(color);
    let outcome = &res.outcome;
    println!("\n{}", palette.bold(palette.paint(format!("💬 Turn: \"{}\"", input), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Intent ━━━", ansi::GRAY));
    match &res.pattern {
        Some(pattern) => println!(
            "  {} {} {}",
            palette.paint(&outcome.intent, ansi::GREEN),
            palette.dim("│ pattern:"),
            palette.paint(pattern, ansi::YELLOW)
        ),
        None => println!("  {}", palette.dim(format!("✗ {} (no pattern matched)", outcome.intent))),
    }

    println!("\n{}", palette.paint("━━━ Transition ━━━", ansi::GRAY));
    println!(
        "  {} → {}",
        palette.paint(&outcome.from_state, ansi::BLUE),
        palette.paint(&outcome.to_state, ansi::BLUE)
    );
    if outcome.recovered {
        println!("  {}", palette.paint("⚠ stored state was not declared; restarted from welcome", ansi::YELLOW));
    }
    if !outcome.matched {
        println!("  {}", palette.dim("✗ no transition for this intent"));
    }
    for action in &outcome.actions {
        println!("    {}", fmt_action_record(action, &palette));
    }

    println!("\n{}", palette.paint("━━━ Reply ━━━", ansi::GRAY));
    let label = if outcome.fallback { palette.dim("(fallback)") } else { String::new() };
    println!("  {} {}", palette.bold(palette.paint(&res.reply, ansi::GREEN)), label);

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Detect: {}  │  Transition: {}",
        palette.paint(format!("{:?}", res.metrics.total), ansi::GREEN),
        palette.paint(format!("{:?}", res.metrics.detect), ansi::CYAN),
        palette.dim(format!("{:?}", res.metrics.transition)),
    );
    println!();
}

pub fn print_rules(rules: &RuleModel, color: bool) {
    let palette = ansi::Palette::new(color);
    let metadata = rules.metadata();
    println!(
        "\n{}",
        palette.bold(palette.paint(
            format!(
                "⚙  Rules: {} {}",
                metadata.bot_name.as_deref().unwrap_or("(unnamed bot)"),
                metadata.version.as_deref().unwrap_or("")
            ),
            ansi::CYAN
        ))
    );

    println!("\n{}", palette.paint("━━━ Intents (matching order) ━━━", ansi::GRAY));
    for (idx, intent) in rules.intents().iter().enumerate() {
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.paint(&intent.name, ansi::GREEN),
            palette.dim(format!("priority {}", intent.priority)),
            palette.dim(format!("│ {} patterns", intent.patterns.len())),
        );
    }

    if !rules.pattern_errors().is_empty() {
        println!("\n{}", palette.paint("━━━ Skipped patterns ━━━", ansi::GRAY));
        for err in rules.pattern_errors() {
            println!("  {}", palette.paint(err.to_string(), ansi::YELLOW));
        }
    }

    println!("\n{}", palette.paint("━━━ States ━━━", ansi::GRAY));
    for state in rules.states() {
        println!("  {}", palette.bold(palette.paint(&state.name, ansi::BLUE)));
        for action in &state.entry_actions {
            println!("    {} {}", palette.dim("entry:"), fmt_action(action));
        }
        for transition in &state.transitions {
            let target = match transition.next_state.as_deref() {
                Some(next) if rules.find_state(next).is_some() => palette.paint(next, ansi::BLUE),
                Some(next) => palette.paint(format!("{next} (undeclared)"), ansi::YELLOW),
                None => palette.dim("(stay)"),
            };
            println!(
                "    {} → {} {}",
                palette.paint(&transition.intent, ansi::GREEN),
                target,
                palette.dim(format!("│ {} actions", transition.actions.len()))
            );
        }
    }

    println!("\n{} {}", palette.dim("Fallback:"), rules.fallback());
    println!();
}

fn fmt_action(action: &Action) -> String {
    match action {
        Action::Response { content } => format!("response \"{content}\""),
        Action::SetContext { key, value } => format!("set_context {key} = \"{value}\""),
        Action::Unrecognized { kind } => format!("{kind} (ignored)"),
    }
}

fn fmt_action_record(record: &ActionRecord, palette: &ansi::Palette) -> String {
    match record {
        ActionRecord::Response { content } => format!("{} \"{}\"", palette.paint("response", ansi::CYAN), content),
        ActionRecord::SetContext { key, value } => {
            format!("{} {} = \"{}\"", palette.paint("set_context", ansi::CYAN), key, value)
        }
        ActionRecord::Skipped { kind } => palette.dim(format!("{kind} (skipped)")),
    }
}
