use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let proto_dir = PathBuf::from("proto");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/");

    // Server stubs for the hello and user services; the HTTP gateway calls
    // the same usecases directly so no client stubs are needed.
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .file_descriptor_set_path(out_dir.join("protoserve_descriptor.bin"))
        .compile_protos(
            &[
                proto_dir.join("hello/v1/hello.proto"),
                proto_dir.join("user/v1/user.proto"),
            ],
            &[&proto_dir],
        )?;

    Ok(())
}
