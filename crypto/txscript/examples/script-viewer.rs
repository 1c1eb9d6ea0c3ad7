use kestrel_txscript::{Script, script_class::ScriptClass, viewer::ScriptViewer};

/// A 2 of 3 pay-to-script-hash signature script
const DEFAULT_SCRIPT: &str = "00483045022100c4ef9b4a4c1d6d3d2b6b7e1e5ba1ef7b1c4a0aa25bbbb8a43fa2d5ac4d2e1b6a02205d4fcbbda39c2ac85e50ebb2ea0c6d56c1d2a4b7f2a9ae0f63c54d87e8b0a1e2014c69522102c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee52102f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f921022f8bde4d1a07209355b4a7250a5c5128e88b84bddc619ab7cba8d569b240efe453ae";

fn main() {
    let script_hex = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCRIPT.to_string());
    let raw = hex::decode(script_hex.trim()).expect("script must be hex encoded");
    let script = Script::from_raw_bytes(&raw).expect("script must parse");

    println!("class: {}", ScriptClass::from_script(&script));
    println!("asm: {script}");
    println!();
    print!("{}", ScriptViewer::new(&script));
}
