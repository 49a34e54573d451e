pub fn run() {
    println!("kube-preflight {}", env!("CARGO_PKG_VERSION"));
}
