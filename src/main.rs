fn main() -> anyhow::Result<()> {
    let command_line_interface = gosmith::cli::CommandLineInterface::load();
    command_line_interface.run()
}
