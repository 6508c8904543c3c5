fn main() -> anyhow::Result<()> {
    sphere_grid::run()
}
