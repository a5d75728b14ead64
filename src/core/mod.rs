// ─── cubelaunch Core ───
// Installation and launch engine for modded Minecraft packages.
//
// Architecture:
//   core/
//     version/     Version index, manifests, inheritance merge, OS rules
//     maven/       Artifact coordinates + maven-metadata.xml
//     downloader/  Concurrent downloads with SHA-1 validation
//     assets/      Asset index + object downloads
//     natives.rs   Native classifier extraction
//     java/        Java runtime provisioning
//     loaders/     Vanilla, Fabric, Quilt, Forge installers
//     package/     Package index, overrides, install/update/verify
//     launch/      Placeholders, classpath, command builder, spawner
//     state/       Settings + shared services

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod natives;
pub mod package;
pub mod paths;
pub mod progress;
pub mod state;
pub mod version;
