use extsx::{
    config, ChannelSink, CreateConfig, Element, HttpResponseSink, MetaSpec, Node, Props,
    RegistryLoader, RenderOptions, RenderOutcome, SetupOptions, SinkEvent, ViewEngine,
};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

fn home(props: &Props) -> anyhow::Result<Node> {
    let user = props.str("user").unwrap_or("stranger");
    Ok(Element::new("main")
        .child(Element::new("h1").child(Node::text(format!("Hello {user}"))))
        .child(Element::new("p").child(Node::text("Rendered on the server.")))
        .into())
}

fn error(props: &Props) -> anyhow::Result<Node> {
    let message = props.values["error"]["message"].as_str().unwrap_or("unknown error");
    Ok(Element::new("section")
        .attr("class", "error")
        .child(Element::new("h1").child(Node::text("Something went wrong")))
        .child(Element::new("pre").child(Node::text(message)))
        .into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Components are registered under the path the resolver builds for them:
    // <view_path>/<name>.<extension>.
    let loader = RegistryLoader::new();
    loader.register("views/home.tsx", home);
    loader.register("views/error.tsx", error);

    // Global config and data are the base layers every render call merges over.
    let site = config(CreateConfig {
        title: Some("Hello views".into()),
        styles: vec!["/css/site.css".into()],
        metas: vec![MetaSpec::named("viewport", "width=device-width, initial-scale=1")],
        fav_icon: Some("/favicon.ico".into()),
        ..Default::default()
    });
    let options = SetupOptions::builder()
        .global_config(site)
        .global_data(json!({ "user": "visitor" }))
        .build()?;

    let engine = ViewEngine::new(options, Arc::new(loader));

    // Buffered: collect the whole response, the way a simple handler would.
    let (outcome, response) = engine
        .render_http("home", Some(json!({ "user": "Ann" })), RenderOptions::new())
        .await;
    println!("home -> {outcome:?} ({})", response.status());
    println!("{}\n", String::from_utf8_lossy(response.body()));

    // Streaming: the render runs in its own task, the body arrives over a channel.
    let (mut sink, rx) = ChannelSink::new(8);
    let ctx = engine.context();
    let render = tokio::spawn(async move {
        ctx.render("missing", None, RenderOptions::new(), &mut sink).await
    });

    let mut events = std::pin::pin!(ChannelSink::into_stream(rx));
    while let Some(event) = events.next().await {
        match event {
            SinkEvent::Status(status) => println!("status: {status}"),
            SinkEvent::Header(name, value) => println!("{name}: {value:?}"),
            SinkEvent::Data(chunk) => println!("{}", String::from_utf8_lossy(&chunk)),
            SinkEvent::End => println!("-- end --"),
        }
    }
    match render.await? {
        RenderOutcome::Recovered { error } => println!("recovered from: {error}\n"),
        other => println!("unexpected outcome: {other:?}\n"),
    }

    // Without a layout the view is sent as is.
    let mut sink = HttpResponseSink::new();
    engine
        .context()
        .render("home", None, RenderOptions::new().no_template(), &mut sink)
        .await;
    println!("{}", String::from_utf8_lossy(sink.into_response().body()));

    Ok(())
}
