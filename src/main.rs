fn main() {
    jjtx::cli::run();
}
