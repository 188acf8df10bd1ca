fn main() {
    vizcue_lib::run()
}
