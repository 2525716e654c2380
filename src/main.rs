fn main() {
    swscan::main();
}
