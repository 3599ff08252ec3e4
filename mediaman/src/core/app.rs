use log::error;

use crate::core::controller::{ControllerError, MediaController};
use crate::core::forms::{FormItem, ItemForm};
use crate::core::input::{InputError, InputHandler, InputProvider};
use crate::core::models::{Book, Movie};
use crate::infra::terminal::TerminalView;

pub type Controller<T> = MediaController<T, TerminalView<T>>;

pub struct App<I: InputProvider> {
    input: InputHandler<I>,
    books: Controller<Book>,
    movies: Controller<Movie>,
}

/// Whether the menu loop should keep going.
enum Flow {
    Continue,
    Quit,
}

impl<I: InputProvider> App<I> {
    pub fn new(input_provider: I, books: Controller<Book>, movies: Controller<Movie>) -> Self {
        Self {
            input: InputHandler::new(input_provider),
            books,
            movies,
        }
    }

    #[cfg(test)]
    pub fn books(&self) -> &Controller<Book> {
        &self.books
    }

    #[cfg(test)]
    pub fn movies(&self) -> &Controller<Movie> {
        &self.movies
    }

    pub async fn run(&mut self) {
        println!("== MEDIAMAN ==");
        report(self.books.reload_collections().await.map(drop));
        report(self.movies.reload_collections().await.map(drop));

        loop {
            println!("\n[1] Books  [2] Movies  [q] Quit");
            let choice = match self.input.get_string_trimmed("Selection: ") {
                Ok(c) => c,
                Err(e) if e.is_eof() => break,
                Err(_) => continue,
            };

            let flow = match choice.as_str() {
                "1" => section(&mut self.input, &self.books).await,
                "2" => section(&mut self.input, &self.movies).await,
                "q" | "Q" => Ok(Flow::Quit),
                _ => {
                    println!("Invalid selection, please try again.");
                    Ok(Flow::Continue)
                }
            };

            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) if e.is_eof() => break,
                Err(e) => eprintln!("Input failure: {e}"),
            }
        }
        println!("Goodbye!");
    }
}

fn report(result: Result<(), ControllerError>) {
    if let Err(e) = result {
        if e.is_contract_violation() {
            error!("Internal error: {e}");
            eprintln!("Internal error: {e}");
        }
        // Storage failures were already shown by the view.
    }
}

async fn section<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<Flow, InputError> {
    let label = T::MEDIA_TYPE.label();
    loop {
        println!(
            "\n-- {label}s --\n[1] List  [2] New collection  [3] Add {label}  [4] Remove {label}  [5] Remove collection  [6] Reload  [0] Back"
        );
        let choice = input.get_string_trimmed("Action: ")?;
        match choice.as_str() {
            "1" => controller.view().await.print_collections(),
            "2" => create_collection_flow(input, controller).await?,
            "3" => create_item_flow(input, controller).await?,
            "4" => remove_item_flow(input, controller).await?,
            "5" => remove_collection_flow(input, controller).await?,
            "6" => {
                let result = controller.reload_collections().await;
                if let Ok(n) = &result {
                    println!("Loaded {n} collection(s).");
                }
                report(result.map(drop));
            }
            "0" => return Ok(Flow::Continue),
            "q" | "Q" => return Ok(Flow::Quit),
            _ => println!("Invalid selection, please try again."),
        }
    }
}

async fn pick_collection<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<Option<String>, InputError> {
    let collections = controller.collections().await;
    if collections.is_empty() {
        println!("No {} collections yet.", T::MEDIA_TYPE);
        return Ok(None);
    }
    for (i, c) in collections.iter().enumerate() {
        println!("  {}. {} ({} items)", i + 1, c.name, c.len());
    }
    let picked = input.choose("Collection #: ", collections.len())?;
    if picked.is_none() {
        println!("Cancelled.");
    }
    Ok(picked.map(|i| collections[i].identifier().to_string()))
}

async fn create_collection_flow<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<(), InputError> {
    let name = input.get_string_trimmed("Collection name: ")?;
    controller.view().await.fill_collection_form(name);
    match controller.create_collection().await {
        Ok(Some(id)) => println!("Created collection [{id}]"),
        Ok(None) => {}
        Err(e) => report(Err(e)),
    }
    Ok(())
}

async fn create_item_flow<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<(), InputError> {
    let Some(collection_id) = pick_collection(input, controller).await? else {
        return Ok(());
    };

    let mut form = ItemForm::new();
    for field in T::FIELDS {
        let suffix = if field.required { "" } else { " (optional)" };
        let value = input.get_string_trimmed(&format!("{}{suffix}: ", field.label))?;
        form.set(field.key, value);
    }
    controller.view().await.fill_item_form(&collection_id, form);

    match controller.create_item(&collection_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let view = controller.view().await;
            if view.last_error().is_none() {
                println!("The {} details are invalid.", T::MEDIA_TYPE);
            }
        }
        Err(e) => report(Err(e)),
    }
    Ok(())
}

async fn remove_item_flow<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<(), InputError> {
    let Some(collection_id) = pick_collection(input, controller).await? else {
        return Ok(());
    };
    let Some(collection) = controller.collection(&collection_id).await else {
        return Ok(());
    };
    if collection.is_empty() {
        println!("Collection is empty.");
        return Ok(());
    }

    let items = collection.items();
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item.summary());
    }
    let Some(idx) = input.choose(&format!("{} #: ", T::MEDIA_TYPE), items.len())? else {
        println!("Cancelled.");
        return Ok(());
    };

    let item_id = items[idx].identifier().to_string();
    match controller.remove_item(&collection_id, &item_id).await {
        Ok(()) => {
            if let Some(item) = collection.find_media(&item_id) {
                println!("Removed: {}", item.name());
            }
        }
        Err(e) => report(Err(e)),
    }
    Ok(())
}

async fn remove_collection_flow<I: InputProvider, T: FormItem>(
    input: &mut InputHandler<I>,
    controller: &Controller<T>,
) -> Result<(), InputError> {
    let Some(collection_id) = pick_collection(input, controller).await? else {
        return Ok(());
    };
    let confirm = input.get_string_trimmed("Remove this collection and its items? (y/N): ")?;
    if confirm != "y" && confirm != "Y" {
        println!("Cancelled.");
        return Ok(());
    }
    match controller.remove_collection(&collection_id).await {
        Ok(()) => println!("Collection removed."),
        Err(e) => report(Err(e)),
    }
    Ok(())
}
