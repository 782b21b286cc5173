use envconfig::Envconfig;

#[derive(Envconfig)]
pub struct Config {
    /// Period between ticker rolls.
    #[envconfig(default = "1")]
    pub tick_interval_secs: u64,

    /// Bound on the whole stop phase at shutdown.
    #[envconfig(default = "10")]
    pub shutdown_grace_secs: u64,

    /// Period between snapshot reports in the log.
    #[envconfig(default = "15")]
    pub snapshot_interval_secs: u64,
}
