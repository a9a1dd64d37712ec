fn main() -> anyhow::Result<()> {
    let command_line_interface = smith_driver::cli::CommandLineInterface::load();
    command_line_interface.run()
}
