fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let proto_file = "proto/gateway.proto";
    let proto_dir = "proto";

    println!("cargo:rerun-if-changed={proto_file}");

    // Use the bundled compiler unless the environment already names one.
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".gateway", "#[derive(serde::Serialize, serde::Deserialize)]")
        .type_attribute(".gateway", "#[serde(default)]")
        .compile_protos(&[proto_file], &[proto_dir])?;

    Ok(())
}
