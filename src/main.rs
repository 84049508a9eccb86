fn main() -> anyhow::Result<()> {
    ludarr::run()
}
